//! Runs both calculation services in the foreground.

use anyhow::Context;
use clap::Args;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use strictqa_calc::{factorization_router, math_router, serve};

/// Serve the factorization and math services over HTTP
#[derive(Args, Debug)]
pub struct ServeCalcCommand {
    /// Address to bind both services to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, default_value_t = 8003)]
    pub factorization_port: u16,

    #[arg(long, default_value_t = 8002)]
    pub math_port: u16,
}

impl ServeCalcCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        if self.factorization_port == self.math_port {
            anyhow::bail!("Both services cannot share port {}", self.math_port);
        }

        let factorization = serve(
            SocketAddr::new(self.host, self.factorization_port),
            factorization_router(),
            "Factorization API",
        );
        let math = serve(
            SocketAddr::new(self.host, self.math_port),
            math_router(),
            "Math API",
        );

        tokio::try_join!(factorization, math).context("calculation services stopped")?;
        Ok(())
    }
}
