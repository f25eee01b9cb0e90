pub mod dev;
pub mod generate;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
