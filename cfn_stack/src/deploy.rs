use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Stack, StackStatus, Tag};
use aws_sdk_cloudformation::Client;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Complete,
    InProgress,
    Failed,
}

/// A rolled back update and a stack deleted after a failed create both
/// count as failures: the requested template is not what is running.
pub fn progress(status: &StackStatus) -> Progress {
    match status {
        StackStatus::CreateComplete | StackStatus::UpdateComplete | StackStatus::ImportComplete => Progress::Complete,

        StackStatus::CreateInProgress
        | StackStatus::DeleteInProgress
        | StackStatus::ImportInProgress
        | StackStatus::ImportRollbackInProgress
        | StackStatus::ReviewInProgress
        | StackStatus::RollbackInProgress
        | StackStatus::UpdateCompleteCleanupInProgress
        | StackStatus::UpdateInProgress
        | StackStatus::UpdateRollbackCompleteCleanupInProgress
        | StackStatus::UpdateRollbackInProgress => Progress::InProgress,

        _ => Progress::Failed,
    }
}

fn aws_error<E: std::error::Error>(operation: &'static str) -> impl Fn(E) -> Error {
    move |e| Error::Aws {
        operation,
        message: DisplayErrorContext(&e).to_string(),
    }
}

/// Creates or updates a CloudFormation stack and waits until it settles.
pub struct Deployer {
    client: Client,
    poll_interval: Duration,
}

impl Deployer {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
            poll_interval: Duration::from_millis(700),
        }
    }

    /// applies the template and returns the stack outputs by key.
    pub async fn deploy(
        &self,
        stack_name: &str,
        template: &Template,
        tags: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let body = template.to_json_pretty()?;
        info!(stack = stack_name, resources = template.resources.len(), "About to deploy stack");
        self.create_or_update_stack(stack_name, &body, tags).await?;
        self.wait_for_output(stack_name).await
    }

    pub async fn does_stack_exist(&self, name: &str) -> Result<bool> {
        match self.client.describe_stacks().stack_name(name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let e_str = DisplayErrorContext(&e).to_string();
                if e_str.contains("does not exist") {
                    return Ok(false);
                }
                Err(Error::Aws { operation: "DescribeStacks", message: e_str })
            }
        }
    }

    /// `Ok(None)` while the stack is still in progress.
    pub async fn describe_stack(&self, name: &str) -> Result<Option<Stack>> {
        let out = match self.client.describe_stacks().stack_name(name).send().await {
            Ok(out) => out,
            Err(e) => {
                let e_str = DisplayErrorContext(&e).to_string();
                if e_str.contains("does not exist") {
                    // create failures are rolled back with OnFailure::Delete
                    return Err(Error::StackFailed {
                        stack: name.to_string(),
                        reason: "stack no longer exists, it was deleted after a failed create".to_string(),
                    });
                }
                return Err(Error::Aws { operation: "DescribeStacks", message: e_str });
            }
        };
        let first = match out.stacks().first() {
            Some(first) => first,
            None => return Err(Error::StackNotFound(name.to_string())),
        };
        let status: Option<&StackStatus> = Option::from(first.stack_status());
        let status = match status {
            Some(status) => status,
            None => return Err(Error::StackNotFound(name.to_string())),
        };
        debug!(stack = name, status = status.as_str(), "stack status");
        match progress(status) {
            Progress::Complete => Ok(Some(first.clone())),
            Progress::InProgress => Ok(None),
            Progress::Failed => {
                warn!(stack = name, status = status.as_str(), "stack did not reach a complete state");
                Err(Error::StackFailed {
                    stack: name.to_string(),
                    reason: first
                        .stack_status_reason()
                        .unwrap_or("Failed to get stack failure reason")
                        .to_string(),
                })
            }
        }
    }

    pub async fn wait_for_output(&self, name: &str) -> Result<BTreeMap<String, String>> {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            match self.describe_stack(name).await? {
                Some(stack) => {
                    println!();
                    let mut out = BTreeMap::new();
                    for output in stack.outputs() {
                        if let (Some(key), Some(val)) = (output.output_key(), output.output_value()) {
                            out.insert(key.to_string(), val.to_string());
                        }
                    }
                    info!(stack = name, outputs = out.len(), "stack is ready");
                    return Ok(out);
                }
                None => {
                    // still waiting
                    print!(".");
                    let _ = std::io::stdout().flush();
                }
            }
        }
    }

    pub async fn create_or_update_stack(
        &self,
        name: &str,
        body: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        let tags = stack_tags(tags);
        if self.does_stack_exist(name).await? {
            info!(stack = name, "Updating stack");
            let res = self
                .client
                .update_stack()
                .capabilities(Capability::CapabilityNamedIam)
                .capabilities(Capability::CapabilityIam)
                .stack_name(name)
                .template_body(body)
                .set_tags(Some(tags))
                .send()
                .await;
            if let Err(e) = res {
                let e_str = DisplayErrorContext(&e).to_string();
                if e_str.contains("No updates are to be performed") {
                    info!(stack = name, "stack is already up to date");
                    return Ok(());
                }
                return Err(Error::Aws { operation: "UpdateStack", message: e_str });
            }
        } else {
            info!(stack = name, "Creating stack");
            self.client
                .create_stack()
                .on_failure(OnFailure::Delete)
                .capabilities(Capability::CapabilityNamedIam)
                .capabilities(Capability::CapabilityIam)
                .stack_name(name)
                .template_body(body)
                .set_tags(Some(tags))
                .send()
                .await
                .map_err(aws_error("CreateStack"))?;
        }
        Ok(())
    }
}

fn stack_tags(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag::builder().key(key).value(value).build())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_statuses() {
        assert_eq!(progress(&StackStatus::CreateComplete), Progress::Complete);
        assert_eq!(progress(&StackStatus::UpdateComplete), Progress::Complete);
    }

    #[test]
    fn rollbacks_are_failures() {
        assert_eq!(progress(&StackStatus::UpdateRollbackComplete), Progress::Failed);
        assert_eq!(progress(&StackStatus::RollbackComplete), Progress::Failed);
        assert_eq!(progress(&StackStatus::CreateFailed), Progress::Failed);
        assert_eq!(progress(&StackStatus::DeleteComplete), Progress::Failed);
    }

    #[test]
    fn in_progress_statuses_keep_polling() {
        assert_eq!(progress(&StackStatus::CreateInProgress), Progress::InProgress);
        assert_eq!(progress(&StackStatus::UpdateCompleteCleanupInProgress), Progress::InProgress);
        assert_eq!(progress(&StackStatus::UpdateRollbackInProgress), Progress::InProgress);
    }

    #[test]
    fn tags_keep_key_order() {
        let mut tags = BTreeMap::new();
        tags.insert("team".to_string(), "web".to_string());
        tags.insert("env".to_string(), "prod".to_string());
        let out = stack_tags(&tags);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key(), Some("env"));
        assert_eq!(out[1].value(), Some("web"));
        assert!(stack_tags(&BTreeMap::new()).is_empty());
    }
}
