//! Interactive download confirmation.

use async_trait::async_trait;
use inquire::Confirm;
use serverup_core::server::{Asset, DownloadPrompt, Release};

/// Asks on the terminal before downloading a build.
///
/// Any failure to ask (no TTY, interrupted) counts as "no".
#[derive(Debug, Clone, Copy, Default)]
pub struct InquirePrompt;

#[async_trait]
impl DownloadPrompt for InquirePrompt {
    async fn confirm_download(&self, release: &Release, asset: &Asset, replacing: bool) -> bool {
        let message = confirmation_message(release, asset, replacing);

        let answer = tokio::task::spawn_blocking(move || {
            Confirm::new(&message)
                .with_default(true)
                .with_help_message("Press Enter to download, or 'n' to skip")
                .prompt()
        })
        .await;

        match answer {
            Ok(Ok(yes)) => yes,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Could not ask for confirmation, skipping download");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation task failed, skipping download");
                false
            }
        }
    }
}

fn confirmation_message(release: &Release, asset: &Asset, replacing: bool) -> String {
    let size = asset
        .size
        .map(|bytes| format!(", {:.1} MB", bytes as f64 / 1_048_576.0))
        .unwrap_or_default();

    if replacing {
        format!(
            "A new language server build is available ({}{}). Update now?",
            release.tag, size
        )
    } else {
        format!(
            "The language server is not installed. Download {} ({}{})?",
            asset.name, release.tag, size
        )
    }
}
