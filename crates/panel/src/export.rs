//! Panel serialization and fingerprinting.

use sha2::{Digest, Sha256};

use crate::error::PanelError;
use crate::model::Panel;

/// The panel as CSV bytes, header first, rows in panel order.
///
/// Output depends only on the panel contents, so identical inputs give
/// byte-identical files.
pub fn panel_csv(panel: &Panel) -> Result<Vec<u8>, PanelError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    for row in panel.rows() {
        writer
            .serialize(row)
            .map_err(|e| PanelError::csv("panel", e))?;
    }
    writer.into_inner().map_err(|e| PanelError::Csv {
        source: "panel".into(),
        message: e.to_string(),
    })
}

/// SHA-256 of the serialized panel, lowercase hex.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
