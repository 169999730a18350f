use clap::Args;

use strongroom_daemon::http_server::api::client::ApiError;
use strongroom_daemon::http_server::api::v0::seal::unseal::{CompleteRequest, UnsealRequest};

#[derive(Args, Debug, Clone)]
pub struct Unseal {
    #[command(flatten)]
    pub request: UnsealRequest,

    /// Combine the collected shares after submitting this one
    #[arg(long)]
    pub complete: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Unseal {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.request.clone()).await?;
        let mut output = format!("share accepted ({} collected)", response.collected);

        if self.complete {
            let status = ctx.client.call(CompleteRequest::default()).await?;
            output.push_str(&format!("\n{}", status));
        }
        Ok(output)
    }
}
