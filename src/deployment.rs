//! Uploading the site and purging the CDN cache once the stack is applied.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use aws_sdk_cloudfront::types::{Invalidation, InvalidationBatch, Paths};
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use crate::error::{aws_error, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// copy every file of the source directory into the bucket. With `prune`
    /// objects that are no longer part of the site are deleted.
    Upload { prune: bool },
    Invalidate { paths: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentStep {
    pub id: String,
    pub kind: StepKind,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDirective {
    pub source_dir: PathBuf,
    /// stack output holding the bucket name.
    pub bucket_output: String,
    /// stack output holding the distribution id.
    pub distribution_output: String,
    pub steps: Vec<DeploymentStep>,
}

impl DeploymentDirective {
    pub fn upload_then_invalidate<P: Into<PathBuf>>(
        source_dir: P,
        bucket_output: &str,
        distribution_output: &str,
        paths: &[&str],
    ) -> Self {
        let upload = DeploymentStep {
            id: "upload".into(),
            kind: StepKind::Upload { prune: true },
            depends_on: vec![],
        };
        let invalidate = DeploymentStep {
            id: "invalidate".into(),
            kind: StepKind::Invalidate {
                paths: paths.iter().map(|p| p.to_string()).collect(),
            },
            depends_on: vec![upload.id.clone()],
        };
        Self {
            source_dir: source_dir.into(),
            bucket_output: bucket_output.into(),
            distribution_output: distribution_output.into(),
            steps: vec![upload, invalidate],
        }
    }

    pub fn step(&self, id: &str) -> Option<&DeploymentStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps in the order they run. A step listed before one of its
    /// dependencies is an error rather than being reordered.
    pub fn execution_order(&self) -> Result<Vec<&DeploymentStep>> {
        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut out = vec![];
        for step in &self.steps {
            for dep in &step.depends_on {
                if !done.contains(dep.as_str()) {
                    return Err(Error::StepOrder {
                        step: step.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            done.insert(&step.id);
            out.push(step);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub path: PathBuf,
    pub key: String,
    pub content_type: &'static str,
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

fn iter_files_recursively<P: AsRef<Path>>(
    start_dir: P,
    callback: &mut impl FnMut(PathBuf) -> Result<()>,
) -> Result<()> {
    for entry in std::fs::read_dir(start_dir.as_ref())? {
        let direntry = entry?;
        let path = direntry.path();
        if direntry.file_type()?.is_dir() {
            iter_files_recursively(&path, callback)?;
        } else {
            callback(path)?;
        }
    }
    Ok(())
}

/// every file under `source_dir`, keyed by its `/` separated path relative to
/// it, sorted by key.
pub fn plan_upload(source_dir: &Path) -> Result<Vec<UploadFile>> {
    if !source_dir.is_dir() {
        return Err(Error::InvalidConfig {
            message: format!("site directory {} does not exist", source_dir.display()),
        });
    }
    let mut files = vec![];
    iter_files_recursively(source_dir, &mut |path| {
        let relative = path.strip_prefix(source_dir).map_err(|_| Error::InvalidConfig {
            message: format!("{} is outside of {}", path.display(), source_dir.display()),
        })?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        files.push(UploadFile {
            content_type: content_type_for(&path),
            path,
            key,
        });
        Ok(())
    })?;
    files.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(files)
}

pub struct DeploymentRunner {
    s3: aws_sdk_s3::Client,
    cloudfront: aws_sdk_cloudfront::Client,
    poll_interval: Duration,
}

impl DeploymentRunner {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            s3: aws_sdk_s3::Client::new(config),
            cloudfront: aws_sdk_cloudfront::Client::new(config),
            poll_interval: Duration::from_secs(5),
        }
    }

    /// `outputs` are the outputs of the applied stack.
    pub async fn run(&self, directive: &DeploymentDirective, outputs: &BTreeMap<String, String>) -> Result<()> {
        let bucket = output(outputs, &directive.bucket_output)?;
        let distribution_id = output(outputs, &directive.distribution_output)?;
        for step in directive.execution_order()? {
            info!(step = %step.id, "running deployment step");
            match &step.kind {
                StepKind::Upload { prune } => {
                    let files = plan_upload(&directive.source_dir)?;
                    self.upload(bucket, &files).await?;
                    if *prune {
                        self.prune(bucket, &files).await?;
                    }
                }
                StepKind::Invalidate { paths } => {
                    let invalidation_id = self.invalidate(distribution_id, paths).await?;
                    self.wait_for_invalidation(distribution_id, &invalidation_id).await?;
                }
            }
        }
        Ok(())
    }

    async fn upload(&self, bucket: &str, files: &[UploadFile]) -> Result<()> {
        for file in files {
            let data = tokio::fs::read(&file.path).await?;
            debug!(key = %file.key, content_type = file.content_type, "uploading");
            self.s3
                .put_object()
                .bucket(bucket)
                .key(&file.key)
                .content_type(file.content_type)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(aws_error("PutObject"))?;
        }
        info!(bucket, count = files.len(), "uploaded site files");
        Ok(())
    }

    async fn prune(&self, bucket: &str, files: &[UploadFile]) -> Result<()> {
        let keep: BTreeSet<&str> = files.iter().map(|f| f.key.as_str()).collect();
        let mut stale = vec![];
        let mut pages = self.s3.list_objects_v2().bucket(bucket).into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(aws_error("ListObjectsV2"))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    if !keep.contains(key) {
                        stale.push(key.to_string());
                    }
                }
            }
        }
        for key in &stale {
            debug!(key = %key, "deleting stale object");
            self.s3
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(aws_error("DeleteObject"))?;
        }
        if !stale.is_empty() {
            info!(bucket, count = stale.len(), "deleted stale objects");
        }
        Ok(())
    }

    async fn invalidate(&self, distribution_id: &str, paths: &[String]) -> Result<String> {
        let caller_reference = format!("static-site-{}", chrono::Utc::now().timestamp_millis());
        let paths = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()
            .map_err(aws_error("CreateInvalidation"))?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(caller_reference)
            .build()
            .map_err(aws_error("CreateInvalidation"))?;
        let out = self
            .cloudfront
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(aws_error("CreateInvalidation"))?;
        let invalidation: Option<&Invalidation> = Option::from(out.invalidation());
        let id: Option<&str> = invalidation.and_then(|i| Option::from(i.id()));
        match id {
            Some(id) => {
                info!(distribution = distribution_id, invalidation = id, "created invalidation");
                Ok(id.to_string())
            }
            None => Err(Error::Aws {
                operation: "CreateInvalidation",
                message: "response did not contain an invalidation id".to_string(),
            }),
        }
    }

    async fn wait_for_invalidation(&self, distribution_id: &str, invalidation_id: &str) -> Result<()> {
        loop {
            let out = self
                .cloudfront
                .get_invalidation()
                .distribution_id(distribution_id)
                .id(invalidation_id)
                .send()
                .await
                .map_err(aws_error("GetInvalidation"))?;
            let invalidation: Option<&Invalidation> = Option::from(out.invalidation());
            let status: Option<&str> = invalidation.and_then(|i| Option::from(i.status()));
            if status == Some("Completed") {
                info!(invalidation = invalidation_id, "invalidation completed");
                return Ok(());
            }
            debug!(invalidation = invalidation_id, status = ?status, "waiting for invalidation");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn output<'a>(outputs: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str> {
    outputs
        .get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| Error::MissingOutput(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidation_waits_for_upload() {
        let directive = DeploymentDirective::upload_then_invalidate("./dist", "WebsiteBucket", "DistributionId", &["/*"]);
        let order: Vec<&str> = directive.execution_order().unwrap().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["upload", "invalidate"]);
        assert_eq!(directive.step("invalidate").unwrap().depends_on, vec!["upload".to_string()]);
        assert!(directive.step("upload").unwrap().depends_on.is_empty());
    }

    #[test]
    fn steps_before_their_dependency_are_refused() {
        let mut directive = DeploymentDirective::upload_then_invalidate("./dist", "B", "D", &["/*"]);
        directive.steps.reverse();
        match directive.execution_order() {
            Err(Error::StepOrder { step, dependency }) => {
                assert_eq!(step, "invalidate");
                assert_eq!(dependency, "upload");
            }
            other => panic!("expected a step order error, got {:?}", other),
        }
    }

    #[test]
    fn upload_plan_walks_the_site_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets/img")).unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("assets/app.js"), "let a;").unwrap();
        std::fs::write(dir.path().join("assets/img/logo.PNG"), [0u8; 4]).unwrap();

        let files = plan_upload(dir.path()).unwrap();
        let keys: Vec<&str> = files.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["assets/app.js", "assets/img/logo.PNG", "index.html"]);
        assert_eq!(files[0].content_type, "application/javascript");
        assert_eq!(files[1].content_type, "image/png");
        assert_eq!(files[2].content_type, "text/html");
    }

    #[test]
    fn missing_site_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(plan_upload(&dir.path().join("dist")), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn unknown_extensions_are_binary() {
        assert_eq!(content_type_for(Path::new("data.bin")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("LICENSE")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("a/b/site.css")), "text/css");
    }

    #[test]
    fn outputs_must_exist() {
        let outputs = BTreeMap::new();
        assert!(matches!(output(&outputs, "WebsiteBucket"), Err(Error::MissingOutput(_))));
    }
}
