use super::{command_output, normalize};
use crate::model::{InstalledSoftware, Platform, Source};
use anyhow::Result;
use async_trait::async_trait;

// PowerShell pipes output in the OEM code page unless told otherwise.
const EDGE_VERSION_COMMAND: &str = "[Console]::OutputEncoding = [Text.Encoding]::UTF8; \
     Get-AppxPackage -Name Microsoft.MicrosoftEdge | Select-Object -ExpandProperty Version";

/// Microsoft Edge installed as an app package (not listed under Uninstall).
pub struct EdgeScanner;

pub(crate) fn edge_from_output(stdout: &str) -> Option<InstalledSoftware> {
    let version = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(InstalledSoftware::new("microsoft edge", version, Source::Appx))
}

#[async_trait]
impl super::Scanner for EdgeScanner {
    fn name(&self) -> &'static str {
        "Microsoft Edge"
    }

    fn source(&self) -> Source {
        Source::Appx
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    async fn scan(&self) -> Result<Vec<InstalledSoftware>> {
        let stdout = command_output(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", EDGE_VERSION_COMMAND],
        )?;

        let software = stdout
            .as_deref()
            .and_then(edge_from_output)
            .into_iter()
            .collect();
        Ok(normalize(software))
    }
}
