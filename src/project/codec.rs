// Share codec - DrumProject <-> compact URL-safe text
// JSON payload, deflated inside a single-entry zip, then base64 (URL alphabet)

use crate::error::{PracticeError, PracticeResult};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sequencer::pattern::DrumProject;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::io::{Cursor, Read, Write};
use zip::{ZipArchive, ZipWriter};

/// Name of the payload entry inside the archive
pub const PROJECT_ENTRY: &str = "project.json";

/// Largest uncompressed payload accepted when decoding
pub const MAX_PAYLOAD_BYTES: u64 = 1024 * 1024;

fn invalid(context: &str, e: impl std::fmt::Display) -> PracticeError {
    PracticeError::Validation(format!("{}: {}", context, e))
}

/// Encode a project as share text
pub fn encode(project: &DrumProject) -> PracticeResult<String> {
    let json = serde_json::to_vec(project).map_err(|e| invalid("Failed to serialize project", e))?;

    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options: zip::write::FileOptions<()> =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    zip_writer
        .start_file(PROJECT_ENTRY, options)
        .map_err(|e| invalid("Failed to compress project", e))?;
    zip_writer
        .write_all(&json)
        .map_err(|e| invalid("Failed to compress project", e))?;
    let archive = zip_writer
        .finish()
        .map_err(|e| invalid("Failed to compress project", e))?
        .into_inner();

    let text = URL_SAFE_NO_PAD.encode(archive);
    log::debug!(
        "Encoded project: {} bytes JSON -> {} chars",
        json.len(),
        text.len()
    );
    Ok(text)
}

/// Decode share text and validate the project it carries
pub fn decode(text: &str) -> PracticeResult<DrumProject> {
    let bytes = URL_SAFE_NO_PAD
        .decode(text.trim())
        .map_err(|e| invalid("Share text is not valid base64", e))?;

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid("Share payload is corrupt", e))?;
    let entry = archive
        .by_name(PROJECT_ENTRY)
        .map_err(|e| invalid("Share payload is corrupt", e))?;

    let mut json = Vec::new();
    entry
        .take(MAX_PAYLOAD_BYTES + 1)
        .read_to_end(&mut json)
        .map_err(|e| invalid("Share payload is corrupt", e))?;
    if json.len() as u64 > MAX_PAYLOAD_BYTES {
        return Err(PracticeError::Validation(
            "Shared project is too large".to_string(),
        ));
    }

    let project: DrumProject =
        serde_json::from_slice(&json).map_err(|e| invalid("Shared project is malformed", e))?;
    project.validate()?;
    Ok(project)
}

/// Decode share text, falling back to the default project
///
/// Empty text means nothing was shared and yields the default quietly.
/// Anything that fails to decode yields the default plus a warning.
pub fn decode_or_default(text: &str) -> (DrumProject, Option<Notification>) {
    if text.trim().is_empty() {
        return (DrumProject::default(), None);
    }

    match decode(text) {
        Ok(project) => (project, None),
        Err(e) => {
            log::warn!("Ignoring shared project: {}", e);
            let notification = Notification::from_error(NotificationCategory::Project, &e);
            (DrumProject::default(), Some(notification))
        }
    }
}
