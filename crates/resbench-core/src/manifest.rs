//! Batch-job submission manifests for container-based training runs.
//!
//! The generated document follows the BatchAI job schema: a container image
//! pulled from a private registry, a shell command line that launches the
//! training script, a log file share, and optionally the dataset blob
//! container mounted under the job's mount root.

use crate::error::BenchResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const MOUNT_ROOT: &str = "$AZ_BATCHAI_JOB_MOUNT_ROOT";
const LOCAL_DATA_DIR: &str = "/data";

/// Per-run toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Container image reference, passed through unchanged.
    pub image: String,
    pub prefetch: bool,
    /// Mount the dataset container and read from the mount.
    pub mount: bool,
    /// Mount the dataset container and copy it to local disk first. Takes
    /// precedence over `mount` for the data directory.
    pub copy_to_local: bool,
    /// Dataset blob container name, passed through unchanged.
    pub dataset: String,
}

impl ManifestOptions {
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            prefetch: false,
            mount: false,
            copy_to_local: false,
            dataset: "imagenet2012".to_string(),
        }
    }

    fn mounts_dataset(&self) -> bool {
        self.mount || self.copy_to_local
    }
}

/// Environment-level values shared by every manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSettings {
    pub schema: String,
    pub storage_account: String,
    pub registry_server: String,
    pub registry_username: String,
    pub registry_password: String,
    /// Storage access token handed to the run script.
    pub access_token: String,
    pub run_script: String,
    pub node_count: u32,
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            schema: "https://raw.githubusercontent.com/Azure/BatchAI/master/schemas/2017-09-01-preview/job.json"
                .to_string(),
            storage_account: "mlperfstorage".to_string(),
            registry_server: "mlperfregistry.azurecr.io".to_string(),
            registry_username: "mlperfregistry".to_string(),
            registry_password: "<registry-password>".to_string(),
            access_token: "<storage-access-token>".to_string(),
            run_script: "/research/resnet/official/resnet/run_az_blob.sh".to_string(),
            node_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub properties: JobProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProperties {
    pub container_settings: ContainerSettings,
    pub custom_toolkit_settings: CustomToolkitSettings,
    pub node_count: u32,
    pub std_out_err_path_prefix: String,
    pub mount_volumes: MountVolumes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSettings {
    pub image_source_registry: ImageSourceRegistry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSourceRegistry {
    pub image: String,
    pub server_url: String,
    pub credentials: RegistryCredentials,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomToolkitSettings {
    pub command_line: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountVolumes {
    pub azure_file_shares: Vec<AzureFileShare>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure_blob_file_systems: Option<Vec<AzureBlobFileSystem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureFileShare {
    pub azure_file_url: String,
    pub relative_mount_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureBlobFileSystem {
    pub account_name: String,
    pub container_name: String,
    pub relative_mount_path: String,
}

/// Build the job command line.
///
/// The data directory is `/data` when copying to local disk, the mounted
/// container when mounting, and the blob URL otherwise.
pub fn build_command_line(options: &ManifestOptions, settings: &ManifestSettings) -> String {
    let mut cmd = String::new();
    if options.copy_to_local {
        cmd.push_str(&format!("cp -r {MOUNT_ROOT}/data {LOCAL_DATA_DIR} && "));
    }
    cmd.push_str(&format!("bash {} {} {} ", settings.run_script, settings.access_token, options.dataset));

    let data_dir = if options.copy_to_local {
        LOCAL_DATA_DIR.to_string()
    } else if options.mount {
        format!("{MOUNT_ROOT}/data")
    } else {
        format!("az://{}.blob.core.windows.net/{}", settings.storage_account, options.dataset)
    };
    cmd.push_str(&format!("-dd {data_dir} "));

    cmd.push_str(if options.prefetch { "--prefetch " } else { "--noprefetch " });
    cmd
}

pub fn generate_job_spec(options: &ManifestOptions, settings: &ManifestSettings) -> JobSpec {
    let azure_blob_file_systems = options.mounts_dataset().then(|| {
        vec![AzureBlobFileSystem {
            account_name: settings.storage_account.clone(),
            container_name: options.dataset.clone(),
            relative_mount_path: "data".to_string(),
        }]
    });

    JobSpec {
        schema: settings.schema.clone(),
        properties: JobProperties {
            container_settings: ContainerSettings {
                image_source_registry: ImageSourceRegistry {
                    image: options.image.clone(),
                    server_url: settings.registry_server.clone(),
                    credentials: RegistryCredentials {
                        username: settings.registry_username.clone(),
                        password: settings.registry_password.clone(),
                    },
                },
            },
            custom_toolkit_settings: CustomToolkitSettings {
                command_line: build_command_line(options, settings),
            },
            node_count: settings.node_count,
            std_out_err_path_prefix: format!("{MOUNT_ROOT}/logs"),
            mount_volumes: MountVolumes {
                azure_file_shares: vec![AzureFileShare {
                    azure_file_url: format!("https://{}.file.core.windows.net/logs", settings.storage_account),
                    relative_mount_path: "logs".to_string(),
                }],
                azure_blob_file_systems,
            },
        },
    }
}

/// Render with four-space indentation and sorted keys, followed by a blank line.
pub fn to_manifest_json(spec: &JobSpec) -> BenchResult<String> {
    // Round-tripping through Value sorts object keys.
    let value = serde_json::to_value(spec)?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;

    let mut out = String::from_utf8_lossy(&buf).into_owned();
    out.push_str("\n\n");
    Ok(out)
}

/// Write the manifest to `path`, overwriting it.
pub fn write_manifest(path: &Path, spec: &JobSpec) -> BenchResult<()> {
    let json = to_manifest_json(spec)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), image = %spec.properties.container_settings.image_source_registry.image, "wrote job manifest");
    Ok(())
}
