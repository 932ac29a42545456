use std::path::Path;

use id3::frame::{Picture as Id3Picture, PictureType as Id3PictureType};
use id3::{Tag as Id3Tag, TagLike, Version};
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};

use crate::api::{release_year, CatalogSongRecord};
use crate::errors::{AppError, Result};
use crate::metadata::artwork::Artwork;
use crate::metadata::TagWriter;

const ID3_EXTENSIONS: &[&str] = &["mp3"];
const MP4_EXTENSIONS: &[&str] = &["m4a", "mp4", "m4b"];

/// Writes ID3v2.4 frames into MP3 files.
pub struct Id3TagWriter;

impl TagWriter for Id3TagWriter {
    fn supports(&self, extension: &str) -> bool {
        ID3_EXTENSIONS.contains(&extension)
    }

    fn write_tags(&self, path: &Path, record: &CatalogSongRecord, artwork: Option<&Artwork>) -> Result<()> {
        // Fresh downloads carry no tag yet.
        let mut tag = match Id3Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => Id3Tag::new(),
            Err(e) => return Err(e.into()),
        };

        tag.set_artist(record.artist_name.as_str());
        tag.set_album(record.collection_name.as_str());
        tag.set_title(record.track_name.as_str());
        tag.set_genre(record.primary_genre_name.as_str());
        tag.set_track(record.track_number);
        tag.set_total_tracks(record.track_count);
        tag.set_disc(record.disc_number);
        tag.set_total_discs(record.disc_count);
        tag.set_text("TDRC", release_year(&record.release_date));

        match record.collection_artist_name.as_deref() {
            Some(album_artist) if !album_artist.is_empty() => tag.set_album_artist(album_artist),
            _ => tag.remove_album_artist(),
        }

        tag.remove_all_pictures();
        if let Some(artwork) = artwork {
            let _ = tag.add_frame(Id3Picture {
                mime_type: artwork.mime_type.clone(),
                picture_type: Id3PictureType::CoverFront,
                description: "Art".to_string(),
                data: artwork.data.clone(),
            });
        }

        tag.write_to_path(path, Version::Id3v24)?;
        Ok(())
    }

    fn get_name(&self) -> &str {
        "id3"
    }
}

/// Writes ilst atoms into MP4 audio containers.
pub struct Mp4TagWriter;

impl TagWriter for Mp4TagWriter {
    fn supports(&self, extension: &str) -> bool {
        MP4_EXTENSIONS.contains(&extension)
    }

    fn write_tags(&self, path: &Path, record: &CatalogSongRecord, artwork: Option<&Artwork>) -> Result<()> {
        let mut tagged_file = lofty::read_from_path(path)?;

        if tagged_file.primary_tag().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| AppError::Tagging(format!("No writable tag for {:?}", path)))?;

        tag.set_artist(record.artist_name.clone());
        tag.set_album(record.collection_name.clone());
        tag.set_title(record.track_name.clone());
        tag.set_genre(record.primary_genre_name.clone());
        tag.set_track(record.track_number);
        tag.set_track_total(record.track_count);
        tag.set_disk(record.disc_number);
        tag.set_disk_total(record.disc_count);
        tag.insert_text(ItemKey::RecordingDate, release_year(&record.release_date).to_string());

        match record.collection_artist_name.as_deref() {
            Some(album_artist) if !album_artist.is_empty() => {
                tag.insert_text(ItemKey::AlbumArtist, album_artist.to_string());
            }
            _ => tag.remove_key(&ItemKey::AlbumArtist),
        }

        tag.remove_picture_type(PictureType::CoverFront);
        if let Some(artwork) = artwork {
            let mime = match artwork.mime_type.as_str() {
                "image/png" => MimeType::Png,
                "image/gif" => MimeType::Gif,
                _ => MimeType::Jpeg,
            };
            tag.push_picture(Picture::new_unchecked(
                PictureType::CoverFront,
                Some(mime),
                None,
                artwork.data.clone(),
            ));
        }

        tag.save_to_path(path, WriteOptions::default())?;
        Ok(())
    }

    fn get_name(&self) -> &str {
        "mp4"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CollectionId;

    fn record() -> CatalogSongRecord {
        CatalogSongRecord {
            track_name: "Jolene".to_string(),
            artist_name: "Dolly Parton".to_string(),
            collection_name: "Jolene".to_string(),
            artwork_url: String::new(),
            primary_genre_name: "Country".to_string(),
            track_number: 1,
            track_count: 10,
            disc_number: 1,
            disc_count: 1,
            collection_id: CollectionId::Numeric(1),
            collection_artist_name: Some("Dolly Parton".to_string()),
            release_date: "1974".to_string(),
        }
    }

    fn fake_mp3() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".mp3").tempfile().unwrap();
        std::io::Write::write_all(&mut file, &[0xFF, 0xFB, 0x90, 0x64, 0, 0, 0, 0]).unwrap();
        file
    }

    #[test]
    fn test_id3_writes_frames_and_cover() {
        let file = fake_mp3();
        let artwork = Artwork::new("u", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);

        Id3TagWriter.write_tags(file.path(), &record(), Some(&artwork)).unwrap();

        let tag = Id3Tag::read_from_path(file.path()).unwrap();
        assert_eq!(tag.artist(), Some("Dolly Parton"));
        assert_eq!(tag.album(), Some("Jolene"));
        assert_eq!(tag.genre(), Some("Country"));
        assert_eq!(tag.track(), Some(1));
        assert_eq!(tag.total_tracks(), Some(10));
        assert_eq!(tag.disc(), Some(1));
        assert_eq!(tag.album_artist(), Some("Dolly Parton"));

        let pictures: Vec<_> = tag.pictures().collect();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].mime_type, "image/jpeg");
        assert_eq!(pictures[0].description, "Art");
    }

    #[test]
    fn test_id3_retag_replaces_cover_and_drops_empty_album_artist() {
        let file = fake_mp3();
        let artwork = Artwork::new("u", vec![0xFF, 0xD8, 0xFF, 0xE0]);
        Id3TagWriter.write_tags(file.path(), &record(), Some(&artwork)).unwrap();

        let mut second = record();
        second.collection_artist_name = None;
        Id3TagWriter.write_tags(file.path(), &second, None).unwrap();

        let tag = Id3Tag::read_from_path(file.path()).unwrap();
        assert_eq!(tag.pictures().count(), 0);
        assert_eq!(tag.album_artist(), None);
    }

    fn atom(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = ((payload.len() + 8) as u32).to_be_bytes().to_vec();
        out.extend_from_slice(name);
        out.extend_from_slice(payload);
        out
    }

    /// Smallest audio-only MP4 layout: ftyp, moov with one "soun" track, mdat.
    fn fake_m4a() -> tempfile::NamedTempFile {
        let ftyp = atom(b"ftyp", b"M4A \0\0\0\0M4A isom");

        let mut mvhd = vec![0u8; 100];
        mvhd[12..16].copy_from_slice(&1000u32.to_be_bytes());
        mvhd[16..20].copy_from_slice(&1000u32.to_be_bytes());
        mvhd[20..24].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        mvhd[24..26].copy_from_slice(&0x0100u16.to_be_bytes());
        mvhd[36..40].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        mvhd[52..56].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        mvhd[68..72].copy_from_slice(&0x4000_0000u32.to_be_bytes());
        mvhd[96..100].copy_from_slice(&2u32.to_be_bytes());

        let mut tkhd = vec![0u8; 84];
        tkhd[3] = 7;
        tkhd[12..16].copy_from_slice(&1u32.to_be_bytes());

        let mut mdhd = vec![0u8; 24];
        mdhd[12..16].copy_from_slice(&44100u32.to_be_bytes());
        mdhd[16..20].copy_from_slice(&44100u32.to_be_bytes());
        mdhd[20..22].copy_from_slice(&0x55C4u16.to_be_bytes());

        let mut hdlr = vec![0u8; 25];
        hdlr[8..12].copy_from_slice(b"soun");

        let mut mp4a = vec![0u8; 28];
        mp4a[6..8].copy_from_slice(&1u16.to_be_bytes());
        mp4a[16..18].copy_from_slice(&2u16.to_be_bytes());
        mp4a[18..20].copy_from_slice(&16u16.to_be_bytes());
        mp4a[24..28].copy_from_slice(&(44100u32 << 16).to_be_bytes());

        let mut stsd = vec![0, 0, 0, 0];
        stsd.extend_from_slice(&1u32.to_be_bytes());
        stsd.extend(atom(b"mp4a", &mp4a));

        let stbl = atom(b"stbl", &atom(b"stsd", &stsd));
        let minf = atom(b"minf", &stbl);
        let mdia = atom(b"mdia", &[atom(b"mdhd", &mdhd), atom(b"hdlr", &hdlr), minf].concat());
        let trak = atom(b"trak", &[atom(b"tkhd", &tkhd), mdia].concat());
        let moov = atom(b"moov", &[atom(b"mvhd", &mvhd), trak].concat());
        let mdat = atom(b"mdat", &[0u8; 16]);

        let mut file = tempfile::Builder::new().suffix(".m4a").tempfile().unwrap();
        std::io::Write::write_all(&mut file, &[ftyp, moov, mdat].concat()).unwrap();
        file
    }

    #[test]
    fn test_mp4_writes_ilst_fields_and_cover() {
        let file = fake_m4a();
        let artwork = Artwork::new("u", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]);

        Mp4TagWriter.write_tags(file.path(), &record(), Some(&artwork)).unwrap();

        let tagged_file = lofty::read_from_path(file.path()).unwrap();
        let tag = tagged_file.primary_tag().unwrap();
        assert_eq!(tag.artist().as_deref(), Some("Dolly Parton"));
        assert_eq!(tag.album().as_deref(), Some("Jolene"));
        assert_eq!(tag.title().as_deref(), Some("Jolene"));
        assert_eq!(tag.genre().as_deref(), Some("Country"));
        assert_eq!(tag.track(), Some(1));
        assert_eq!(tag.track_total(), Some(10));
        assert_eq!(tag.disk(), Some(1));
        assert_eq!(tag.disk_total(), Some(1));
        assert_eq!(tag.get_string(&ItemKey::RecordingDate), Some("1974"));
        assert_eq!(tag.get_string(&ItemKey::AlbumArtist), Some("Dolly Parton"));
        assert_eq!(tag.pictures().len(), 1);
        assert_eq!(tag.pictures()[0].pic_type(), PictureType::CoverFront);
    }

    #[test]
    fn test_mp4_retag_replaces_cover_and_drops_empty_album_artist() {
        let file = fake_m4a();
        let artwork = Artwork::new("u", vec![0xFF, 0xD8, 0xFF, 0xE0]);
        Mp4TagWriter.write_tags(file.path(), &record(), Some(&artwork)).unwrap();

        let mut second = record();
        second.collection_artist_name = None;
        second.track_name = "Jolene (Live)".to_string();
        Mp4TagWriter.write_tags(file.path(), &second, Some(&artwork)).unwrap();

        let tagged_file = lofty::read_from_path(file.path()).unwrap();
        let tag = tagged_file.primary_tag().unwrap();
        assert_eq!(tag.title().as_deref(), Some("Jolene (Live)"));
        assert_eq!(tag.get_string(&ItemKey::AlbumArtist), None);
        assert_eq!(tag.pictures().len(), 1);
    }

    #[test]
    fn test_mp4_rejects_non_mp4_bytes() {
        let mut file = tempfile::Builder::new().suffix(".m4a").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"not an mp4 container").unwrap();
        assert!(Mp4TagWriter.write_tags(file.path(), &record(), None).is_err());
    }

    #[test]
    fn test_writer_extensions() {
        assert!(Id3TagWriter.supports("mp3"));
        assert!(!Id3TagWriter.supports("m4a"));
        assert!(Mp4TagWriter.supports("m4a"));
        assert!(Mp4TagWriter.supports("m4b"));
        assert!(!Mp4TagWriter.supports("flac"));
    }
}
