use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ConverterSettings;
use crate::errors::{Result, SplitterError};

/// Runs `gdal_translate` inside a container, so formats the local GDAL build cannot read
/// (ECW) still end up as GeoTIFF. Input and output both live in `data_dir`, which is
/// bind-mounted into the container.
pub struct FormatConverter {
    settings: ConverterSettings,
}

impl FormatConverter {
    pub fn new(settings: ConverterSettings) -> Self {
        FormatConverter { settings }
    }

    pub fn docker_args(&self, data_dir: &Path, input: &str, output: &str) -> Vec<String> {
        let mount = &self.settings.mount_point;
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
            "--name".to_string(),
            self.settings.container_name.clone(),
            "-v".to_string(),
            format!("{}:{}", data_dir.display(), mount),
            self.settings.image.clone(),
            "gdal_translate".to_string(),
            format!("{}/{}", mount, input),
            format!("{}/{}", mount, output),
        ]
    }

    /// Converts `input` into `output`. Both must sit in the same directory, otherwise nothing
    /// is run and [`SplitterError::ConversionOutsideDataDir`] is returned.
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        // the bind mount needs an absolute host path
        let data_dir = tokio::fs::canonicalize(parent_dir(input)?).await?;
        let output_dir = tokio::fs::canonicalize(parent_dir(output)?).await?;
        if output_dir != data_dir {
            return Err(SplitterError::ConversionOutsideDataDir {
                data_dir,
                output: output.to_path_buf(),
            });
        }
        let input_name = file_name(input)?;
        let output_name = file_name(output)?;

        let args = self.docker_args(&data_dir, &input_name, &output_name);
        debug!("{} {}", self.settings.program, args.join(" "));
        info!(
            "Converting {} to {} with {}",
            input.display(),
            output.display(),
            self.settings.image
        );

        let status = Command::new(&self.settings.program)
            .args(&args)
            .status()
            .await?;
        if !status.success() {
            return Err(SplitterError::ConversionFailed {
                input: input.to_path_buf(),
                status,
            });
        }

        let written = data_dir.join(&output_name);
        if !tokio::fs::try_exists(&written).await? {
            return Err(SplitterError::ConversionOutputMissing(written));
        }
        Ok(())
    }
}

fn parent_dir(path: &Path) -> Result<std::path::PathBuf> {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.to_path_buf()),
        _ => Ok(std::env::current_dir()?),
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SplitterError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            ))
        })
}
