use clap::Args;

use strongroom_daemon::http_server::api::client::ApiError;
use strongroom_daemon::http_server::api::v0::seal::status::StatusRequest;

#[derive(Args, Debug, Clone)]
pub struct Status;

#[async_trait::async_trait]
impl crate::cli::op::Op for Status {
    type Error = ApiError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let status = ctx.client.call(StatusRequest::default()).await?;
        Ok(status.to_string())
    }
}
