use clap::Args;
use zeroize::Zeroizing;

use common::crypto::{split, Secret, SecretError, ShamirError};
use strongroom_daemon::http_server::api::encoding::encode_share;

#[derive(Args, Debug, Clone)]
pub struct Split {
    /// Number of shares to produce
    #[arg(long, short = 'p')]
    pub parts: usize,

    /// Shares required to reconstruct the secret
    #[arg(long, short = 't')]
    pub threshold: usize,

    /// Hex encoded secret to split; a fresh 32-byte secret is generated if omitted
    #[arg(long)]
    pub secret: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("secret is not valid hex")]
    InvalidHex,
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Shamir(#[from] ShamirError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Split {
    type Error = SplitError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let secret = match &self.secret {
            Some(encoded) => Zeroizing::new(
                hex::decode(encoded.trim()).map_err(|_| SplitError::InvalidHex)?,
            ),
            None => Zeroizing::new(Secret::generate()?.bytes().to_vec()),
        };

        let shares = split(&secret, self.parts, self.threshold)?;
        let lines: Vec<String> = shares
            .into_iter()
            .map(|share| encode_share(&Zeroizing::new(share)))
            .collect();
        Ok(lines.join("\n"))
    }
}
