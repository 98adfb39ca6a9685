//! Cinder volume payloads

use serde::{Deserialize, Serialize};

/// `GET /volumes/{id}` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub volume: VolumeDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDetails {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub volume_image_metadata: VolumeImageMetadata,
}

/// Image metadata attached to a bootable volume. Cinder reports every value
/// as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeImageMetadata {
    pub checksum: String,
    pub min_ram: String,
    pub disk_format: String,
    pub image_name: String,
    pub image_id: String,
    pub signature_verified: String,
    pub container_format: String,
    pub min_disk: String,
    pub size: String,
}
