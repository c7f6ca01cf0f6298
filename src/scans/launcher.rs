//! Scan Launcher
//!
//! Takes a launch request from validation to a triggered scan: resolve or
//! create the project and application, upload the archive, merge the
//! configuration, trigger, then hand the scan to the completion tracker.
//! Every failure before the trigger aborts the launch with the name or id
//! that was being worked on.

use crate::client::traits::RemoteScanClient;
use crate::client::types::{Application, Project, Scan, COMMIT_ID_TAG};
use crate::core::sync::NameLocks;
use crate::core::validation::{require_non_empty, require_positive_size};
use crate::scans::categorizer::first_project;
use crate::scans::config_merge::{merge_for_project, MergeRequest};
use crate::scans::error::{ScanServiceError, ScanServiceResult};
use crate::scans::tracker::CompletionTracker;
use crate::scans::types::{AssignmentAck, LaunchRequest};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct ScanLauncher {
    client: Arc<dyn RemoteScanClient>,
    tracker: CompletionTracker,
    project_locks: NameLocks,
    application_locks: NameLocks,
}

impl ScanLauncher {
    pub fn new(client: Arc<dyn RemoteScanClient>, tracker: CompletionTracker) -> Self {
        Self {
            client,
            tracker,
            project_locks: NameLocks::new(),
            application_locks: NameLocks::new(),
        }
    }

    /// Run the launch sequence and return the triggered scan
    ///
    /// Tracking continues in the background after this returns; its outcome
    /// never reaches the caller.
    pub async fn launch(&self, request: LaunchRequest) -> ScanServiceResult<Scan> {
        validate(&request)?;
        let LaunchRequest {
            app_name,
            project_name,
            branch,
            commit_id,
            scan_types,
            is_fast_scan,
            preset,
            mut tags,
            file,
            file_size,
        } = request;

        log::info!(
            "Starting scan for project '{}' on branch '{}' (commit {})",
            project_name,
            branch,
            commit_id
        );

        let project = self.get_or_create_project(&project_name).await?;
        self.assign(&app_name, &project).await?;

        let upload_url = self
            .client
            .upload_stream_for_project(&project.project_id, file, file_size)
            .await
            .map_err(|e| {
                ScanServiceError::upstream(
                    format!("failed to upload file to project {}", project.project_id),
                    e,
                )
            })?;
        log::info!(
            "Uploaded {} bytes to project {}",
            file_size,
            project.project_id
        );

        let configurations = merge_for_project(
            self.client.as_ref(),
            &project.project_id,
            &MergeRequest {
                scan_types: &scan_types,
                is_fast_scan,
                preset: Some(preset.as_str()),
            },
        )
        .await
        .map_err(|e| {
            ScanServiceError::upstream(
                format!(
                    "failed to get default scan configuration for project {}",
                    project.project_id
                ),
                e,
            )
        })?;

        tags.insert(COMMIT_ID_TAG.to_string(), commit_id);

        let scan = self
            .client
            .trigger_zip_scan(
                &project.project_id,
                &upload_url,
                &branch,
                &configurations,
                &tags,
            )
            .await
            .map_err(|e| {
                ScanServiceError::upstream(
                    format!("failed to trigger scan for project {}", project.project_id),
                    e,
                )
            })?;
        log::info!(
            "Scan {} triggered for project {} with status {}",
            scan.scan_id,
            project.project_id,
            scan.status
        );

        self.tracker.start(scan.clone());
        Ok(scan)
    }

    /// Resolve both names, creating what is missing, and link them
    pub async fn assign_project_to_app(
        &self,
        app_name: &str,
        project_name: &str,
    ) -> ScanServiceResult<AssignmentAck> {
        require_non_empty("application name", app_name)?;
        require_non_empty("project name", project_name)?;

        let project = self.get_or_create_project(project_name).await?;
        self.assign(app_name, &project).await
    }

    /// First project with the name, created with no groups or tags when absent
    pub async fn get_or_create_project(&self, name: &str) -> ScanServiceResult<Project> {
        let _guard = self.project_locks.acquire(name).await;

        let projects = self
            .client
            .get_projects_by_name(name)
            .await
            .map_err(|e| ScanServiceError::upstream(format!("failed to get project '{}'", name), e))?;

        if let Some(project) = first_project(name, projects) {
            log::info!("Project '{}' found with ID {}", name, project.project_id);
            return Ok(project);
        }

        log::info!("Project '{}' not found, creating it", name);
        let project = self
            .client
            .create_project(name, &[], &BTreeMap::new())
            .await
            .map_err(|e| {
                ScanServiceError::upstream(format!("failed to create project '{}'", name), e)
            })?;
        log::info!("Created project '{}' with ID {}", name, project.project_id);
        Ok(project)
    }

    // Application lookup, assignment and update run under one lock so
    // concurrent assignments to the same application are not lost
    async fn assign(&self, app_name: &str, project: &Project) -> ScanServiceResult<AssignmentAck> {
        let _guard = self.application_locks.acquire(app_name).await;

        let mut application = self.get_or_create_application(app_name).await?;
        let newly_assigned = application.assign_project(project);
        self.client
            .update_application(&application)
            .await
            .map_err(|e| {
                ScanServiceError::upstream(
                    format!("failed to update application '{}'", app_name),
                    e,
                )
            })?;

        log::info!(
            "Project '{}' assigned to application '{}'{}",
            project.name,
            app_name,
            if newly_assigned { "" } else { " (already assigned)" }
        );
        Ok(AssignmentAck {
            application_id: application.application_id,
            project_id: project.project_id.clone(),
            newly_assigned,
        })
    }

    async fn get_or_create_application(&self, name: &str) -> ScanServiceResult<Application> {
        let existing = self
            .client
            .get_application_by_name(name)
            .await
            .map_err(|e| {
                ScanServiceError::upstream(format!("failed to get application '{}'", name), e)
            })?;

        match existing {
            Some(application) => {
                log::info!("Application '{}' found", name);
                Ok(application)
            }
            None => {
                log::info!("Application '{}' not found, creating it", name);
                self.client.create_application(name).await.map_err(|e| {
                    ScanServiceError::upstream(format!("failed to create application '{}'", name), e)
                })
            }
        }
    }
}

fn validate(request: &LaunchRequest) -> ScanServiceResult<()> {
    require_non_empty("application name", &request.app_name)?;
    require_non_empty("project name", &request.project_name)?;
    require_non_empty("branch", &request.branch)?;
    require_non_empty("commit ID", &request.commit_id)?;
    require_positive_size("file contents", request.file_size)?;
    require_non_empty("preset", &request.preset)?;
    Ok(())
}
