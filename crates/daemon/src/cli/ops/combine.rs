use clap::Args;
use zeroize::Zeroizing;

use common::crypto::{combine, ShamirError};
use strongroom_daemon::http_server::api::encoding::decode_share;

#[derive(Args, Debug, Clone)]
pub struct Combine {
    /// Base64 encoded shares, at least as many as the split threshold
    #[arg(required = true, num_args = 2..)]
    pub parts: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    #[error("share {0} is not valid base64")]
    InvalidPart(usize),
    #[error(transparent)]
    Shamir(#[from] ShamirError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Combine {
    type Error = CombineError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let shares = self
            .parts
            .iter()
            .enumerate()
            .map(|(idx, part)| {
                decode_share(part)
                    .map(Zeroizing::new)
                    .ok_or(CombineError::InvalidPart(idx + 1))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let views: Vec<&[u8]> = shares.iter().map(|share| share.as_slice()).collect();
        let secret = Zeroizing::new(combine(&views)?);
        Ok(hex::encode(secret.as_slice()))
    }
}
