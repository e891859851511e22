//! Versioned binary snapshots of search state.
//!
//! A checkpoint file starts with the tag `CMIX` and the implementor's format
//! version, followed by the bincode payload (fixed-width integers, little
//! endian). The header is checked before any payload bytes are decoded.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::MixerError;

/// Leading bytes of every checkpoint file.
pub const CHECKPOINT_TAG: [u8; 4] = *b"CMIX";

/// Errors that can occur while saving or loading checkpoints.
#[derive(Debug)]
pub enum CheckpointError {
    /// Reading or writing the checkpoint file failed.
    Io(io::Error),
    /// The payload could not be encoded or decoded by bincode.
    Serialization(bincode::Error),
    /// The file was written by an incompatible format version.
    VersionMismatch { expected: u32, found: u32 },
    /// The file is not a checkpoint, or its contents are inconsistent.
    InvalidFormat(String),
    /// The restored state failed validation.
    Mixer(MixerError),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Io(err) => write!(f, "Checkpoint I/O failed: {err}"),
            CheckpointError::Serialization(err) => write!(f, "Checkpoint codec error: {err}"),
            CheckpointError::VersionMismatch { expected, found } => write!(
                f,
                "Checkpoint format v{found} cannot be read (expected v{expected})"
            ),
            CheckpointError::InvalidFormat(msg) => write!(f, "Not a valid checkpoint: {msg}"),
            CheckpointError::Mixer(err) => write!(f, "Checkpointed state is invalid: {err}"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(err: io::Error) -> Self {
        CheckpointError::Io(err)
    }
}

impl From<bincode::Error> for CheckpointError {
    fn from(err: bincode::Error) -> Self {
        CheckpointError::Serialization(err)
    }
}

impl From<MixerError> for CheckpointError {
    fn from(err: MixerError) -> Self {
        CheckpointError::Mixer(err)
    }
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

/// State that can be written between ticks and restored exactly.
///
/// Implementors build a serialisable snapshot and hand it to
/// [`write_snapshot`](Checkpointable::write_snapshot); the header carrying
/// [`FORMAT_VERSION`](Checkpointable::FORMAT_VERSION) is handled here.
pub trait Checkpointable: Sized {
    /// Bumped whenever the snapshot layout changes.
    const FORMAT_VERSION: u32;

    /// Save the current state to `path`, replacing any existing file.
    fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError>;

    /// Restore a state previously written by [`save_checkpoint`](Checkpointable::save_checkpoint).
    fn load_checkpoint<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError>;

    /// Write header and `snapshot` to `path`, creating parent directories.
    fn write_snapshot<P, T>(snapshot: &T, path: P) -> Result<(), CheckpointError>
    where
        P: AsRef<Path>,
        T: Serialize,
    {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&CHECKPOINT_TAG)?;
        codec().serialize_into(&mut writer, &Self::FORMAT_VERSION)?;
        codec().serialize_into(&mut writer, snapshot)?;
        writer.flush()?;
        Ok(())
    }

    /// Check the header of `path` and decode the snapshot after it.
    fn read_snapshot<P, T>(path: P) -> Result<T, CheckpointError>
    where
        P: AsRef<Path>,
        T: DeserializeOwned,
    {
        let mut reader = BufReader::new(File::open(path)?);

        let mut tag = [0u8; 4];
        reader.read_exact(&mut tag)?;
        if tag != CHECKPOINT_TAG {
            return Err(CheckpointError::InvalidFormat(format!(
                "unexpected file tag {:02x?}",
                tag
            )));
        }

        let found: u32 = codec().deserialize_from(&mut reader)?;
        if found != Self::FORMAT_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: Self::FORMAT_VERSION,
                found,
            });
        }

        Ok(codec().deserialize_from(&mut reader)?)
    }
}
