use anyhow::Context as _;
use std::process::{Child, Command};

pub use lws_test_support::KillOnDrop;

pub fn pick_unused_port() -> anyhow::Result<u16> {
    lws_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: std::time::Duration) -> anyhow::Result<()> {
    lws_test_support::wait_http_ok(url, timeout_dur).await
}

pub fn spawn_authorization_server(envs: &[(&str, &str)]) -> anyhow::Result<Child> {
    let bin = env!("CARGO_BIN_EXE_lws-authorization-server");
    Command::new(bin)
        .envs(envs.iter().copied())
        .spawn()
        .context("spawn lws-authorization-server")
}

pub fn spawn_resource_server(envs: &[(&str, &str)]) -> anyhow::Result<Child> {
    let bin = env!("CARGO_BIN_EXE_lws-resource-server");
    Command::new(bin)
        .envs(envs.iter().copied())
        .spawn()
        .context("spawn lws-resource-server")
}
