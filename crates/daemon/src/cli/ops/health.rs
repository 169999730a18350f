use clap::Args;

use strongroom_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug, thiserror::Error)]
pub enum HealthError {}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = HealthError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = vec!["Config:".to_string()];
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  directory:  {}", state.state_dir.display()));
                lines.push(format!("  api_port:   {}", state.config.api_port));
                let token_key = match state.load_token_key() {
                    Ok(_) => "OK".to_string(),
                    Err(e) => e.to_string(),
                };
                lines.push(format!("  token.key:  {}", token_key));
            }
            Err(e) => lines.push(format!("  error: {}", e)),
        }

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", ctx.client.base_url()));
        for (name, path) in [("livez", "/_status/livez"), ("readyz", "/_status/readyz")] {
            let result = match ctx.client.probe(path).await {
                Ok(status) if status.is_success() => "OK".to_string(),
                Ok(status) => format!("UNHEALTHY ({})", status),
                Err(_) => "NOT REACHABLE".to_string(),
            };
            lines.push(format!("  {:<7} {}", format!("{}:", name), result));
        }

        Ok(lines.join("\n"))
    }
}
