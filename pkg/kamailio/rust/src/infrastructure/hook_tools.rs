// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Adapters backed by the platform's hook tools (`config-get`, `status-set`,
//! `action-*`, `relation-*`, `is-leader`).

use crate::actions::ActionChannel;
use crate::config::{ConfigOptions, ConfigSource, DesiredConfig};
use crate::error::{OperatorError, Result};
use crate::ingress::{IngressRegistrar, IngressSpec};
use crate::status::{StatusReporter, UnitStatus};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::process::Command;

pub const INGRESS_RELATION: &str = "ingress";

/// Runs one hook tool and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, tool: &str, args: &[String]) -> Result<String>;
}

/// Runs hook tools as child processes found on `PATH`.
#[derive(Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, tool: &str, args: &[String]) -> Result<String> {
        debug!("running {tool} {args:?}");
        let output = Command::new(tool)
            .args(args)
            .output()
            .await
            .map_err(|e| OperatorError::hook_tool(tool, e.to_string()))?;

        if !output.status.success() {
            return Err(OperatorError::hook_tool(
                tool,
                format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Action result keys may only hold lowercase letters, digits and dashes.
fn result_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

pub struct HookTools {
    runner: Arc<dyn CommandRunner>,
    options: ConfigOptions,
}

impl HookTools {
    pub fn new(runner: Arc<dyn CommandRunner>, options: ConfigOptions) -> Self {
        Self { runner, options }
    }

    async fn run(&self, tool: &str, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runner.run(tool, &args).await
    }

    async fn run_json(&self, tool: &str, args: &[&str]) -> Result<Value> {
        let out = self.run(tool, args).await?;
        let trimmed = out.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(trimmed)
            .map_err(|e| OperatorError::hook_tool(tool, format!("unexpected output: {e}")))
    }

    pub async fn is_leader(&self) -> Result<bool> {
        Ok(self
            .run_json("is-leader", &["--format=json"])
            .await?
            .as_bool()
            .unwrap_or(false))
    }

    pub async fn relation_ids(&self, relation: &str) -> Result<Vec<String>> {
        match self
            .run_json("relation-ids", &[relation, "--format=json"])
            .await?
        {
            Value::Null => Ok(Vec::new()),
            Value::Array(ids) => Ok(ids
                .into_iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect()),
            other => Err(OperatorError::hook_tool(
                "relation-ids",
                format!("unexpected output: {other}"),
            )),
        }
    }

    pub async fn relation_set_app(
        &self,
        relation_id: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<()> {
        let pairs: Vec<String> = data.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let mut args = vec!["-r", relation_id, "--app"];
        args.extend(pairs.iter().map(String::as_str));
        self.run("relation-set", &args).await.map(|_| ())
    }
}

#[async_trait]
impl ConfigSource for HookTools {
    async fn desired_config(&self) -> Result<DesiredConfig> {
        let values = match self.run_json("config-get", &["--format=json"]).await? {
            Value::Object(values) => values,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(OperatorError::hook_tool(
                    "config-get",
                    format!("expected an object, got {other}"),
                ));
            }
        };
        DesiredConfig::from_values(&self.options, &values)
    }
}

#[async_trait]
impl StatusReporter for HookTools {
    async fn set_status(&self, status: &UnitStatus) -> Result<()> {
        self.run("status-set", &[status.name(), status.message()])
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ActionChannel for HookTools {
    async fn param(&self, name: &str) -> Result<String> {
        match self.run_json("action-get", &[name, "--format=json"]).await? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }

    async fn set_results(&self, results: &BTreeMap<String, String>) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }
        let pairs: Vec<String> = results
            .iter()
            .map(|(k, v)| format!("{}={v}", result_key(k)))
            .collect();
        let args: Vec<&str> = pairs.iter().map(String::as_str).collect();
        self.run("action-set", &args).await.map(|_| ())
    }

    async fn fail(&self, message: &str) -> Result<()> {
        self.run("action-fail", &[message]).await.map(|_| ())
    }
}

/// Publishes ingress requirements as application data on the `ingress`
/// relation.
pub struct RelationIngress {
    tools: Arc<HookTools>,
}

impl RelationIngress {
    pub fn new(tools: Arc<HookTools>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl IngressRegistrar for RelationIngress {
    async fn update_config(&self, spec: &IngressSpec) -> Result<()> {
        // Application data is writable by the leader only.
        if !self.tools.is_leader().await? {
            debug!("not the leader, leaving ingress data untouched");
            return Ok(());
        }

        let relation_ids = self.tools.relation_ids(INGRESS_RELATION).await?;
        if relation_ids.is_empty() {
            debug!("no {INGRESS_RELATION} relation yet");
            return Ok(());
        }

        let data = spec.to_relation_data();
        for id in &relation_ids {
            self.tools.relation_set_app(id, &data).await?;
            info!(
                "published ingress for {} on {id}",
                spec.service_hostname
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DesiredConfig;
    use std::sync::Mutex;

    /// Replays canned stdout per tool and records every invocation.
    #[derive(Default)]
    struct FakeRunner {
        outputs: BTreeMap<String, String>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeRunner {
        fn with(outputs: &[(&str, &str)]) -> Self {
            Self {
                outputs: outputs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_to(&self, tool: &str) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter(|(t, _)| t == tool)
                .map(|(_, args)| args)
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, tool: &str, args: &[String]) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((tool.to_string(), args.to_vec()));
            Ok(self.outputs.get(tool).cloned().unwrap_or_default())
        }
    }

    fn tools(runner: Arc<FakeRunner>) -> Arc<HookTools> {
        Arc::new(HookTools::new(runner, ConfigOptions::embedded().unwrap()))
    }

    #[test]
    fn test_result_key() {
        assert_eq!(result_key("kamctl called with args"), "kamctl-called-with-args");
        assert_eq!(result_key("output"), "output");
        assert_eq!(result_key(" Odd__Key "), "odd-key");
    }

    #[tokio::test]
    async fn test_config_get_merges_defaults() {
        let runner = Arc::new(FakeRunner::with(&[(
            "config-get",
            r#"{"bind-address-port": "udp:0.0.0.0:5069", "external-url": ""}"#,
        )]));
        let config = tools(runner.clone()).desired_config().await.unwrap();

        assert_eq!(config.bind_address_port, "udp:0.0.0.0:5069");
        assert_eq!(config.sip_domain, "");
        assert_eq!(runner.calls_to("config-get"), vec![vec!["--format=json"]]);
    }

    #[tokio::test]
    async fn test_status_set() {
        let runner = Arc::new(FakeRunner::default());
        tools(runner.clone())
            .set_status(&UnitStatus::Blocked("bad listen address".to_string()))
            .await
            .unwrap();
        assert_eq!(
            runner.calls_to("status-set"),
            vec![vec!["blocked", "bad listen address"]]
        );
    }

    #[tokio::test]
    async fn test_action_io() {
        let runner = Arc::new(FakeRunner::with(&[("action-get", "\"ps\"\n")]));
        let tools = tools(runner.clone());

        assert_eq!(tools.param("args").await.unwrap(), "ps");

        let results = BTreeMap::from([(
            "kamctl called with args".to_string(),
            "Currently not implemented.".to_string(),
        )]);
        tools.set_results(&results).await.unwrap();
        tools.fail("kamailio is not running").await.unwrap();

        assert_eq!(
            runner.calls_to("action-set"),
            vec![vec!["kamctl-called-with-args=Currently not implemented."]]
        );
        assert_eq!(
            runner.calls_to("action-fail"),
            vec![vec!["kamailio is not running"]]
        );
    }

    #[tokio::test]
    async fn test_ingress_published_by_leader() {
        let runner = Arc::new(FakeRunner::with(&[
            ("is-leader", "true"),
            ("relation-ids", r#"["ingress:7"]"#),
        ]));
        let spec = IngressSpec::from_config("kamailio", &DesiredConfig::default());
        let ingress = RelationIngress::new(tools(runner.clone()));

        ingress.update_config(&spec).await.unwrap();

        assert_eq!(
            runner.calls_to("relation-set"),
            vec![vec![
                "-r",
                "ingress:7",
                "--app",
                "service-hostname=kamailio",
                "service-name=kamailio",
                "service-port=5060",
            ]]
        );
    }

    #[tokio::test]
    async fn test_ingress_skipped_for_non_leader() {
        let runner = Arc::new(FakeRunner::with(&[
            ("is-leader", "false"),
            ("relation-ids", r#"["ingress:7"]"#),
        ]));
        let spec = IngressSpec::from_config("kamailio", &DesiredConfig::default());

        RelationIngress::new(tools(runner.clone()))
            .update_config(&spec)
            .await
            .unwrap();

        assert!(runner.calls_to("relation-set").is_empty());
        assert!(runner.calls_to("relation-ids").is_empty());
    }

    #[tokio::test]
    async fn test_ingress_without_relation() {
        let runner = Arc::new(FakeRunner::with(&[
            ("is-leader", "true"),
            ("relation-ids", "[]"),
        ]));
        let spec = IngressSpec::from_config("kamailio", &DesiredConfig::default());
        RelationIngress::new(tools(runner.clone()))
            .update_config(&spec)
            .await
            .unwrap();
        assert!(runner.calls_to("relation-set").is_empty());
    }
}
