//! In-memory scanning platform
//!
//! A scripted stand-in for the remote platform, used by the test suites and
//! for local experiments. Every trait operation can be made to fail through a
//! [`FailPoint`], calls are counted, and triggered scans advance along a
//! configurable status script each time they are read.

use crate::client::error::{ClientError, ClientResult};
use crate::client::traits::{RemoteScanClient, UploadStream};
use crate::client::types::{
    Application, ConfigurationSetting, Project, Scan, ScanConfiguration, ScanFilter, ScanResults,
    ScanStatus, COMMIT_ID_TAG,
};
use crate::core::poll::PollPolicy;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use strum_macros::{AsRefStr, EnumIter};
use tokio::io::AsyncReadExt;

/// Remote operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FailPoint {
    GetApplication,
    CreateApplication,
    UpdateApplication,
    GetProjects,
    CreateProject,
    GetScan,
    ListScans,
    Upload,
    GetDefaultConfiguration,
    UpdateProjectConfiguration,
    Trigger,
    GetResults,
    GetScanConfiguration,
    PolicyViolation,
    Cancel,
}

/// An archive received by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRecord {
    pub project_id: String,
    pub declared_size: u64,
    pub received: Vec<u8>,
    pub upload_url: String,
}

/// Arguments of a trigger call
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRecord {
    pub project_id: String,
    pub upload_url: String,
    pub branch: String,
    pub configurations: Vec<ScanConfiguration>,
    pub tags: BTreeMap<String, String>,
}

/// Description of a scan placed directly into the platform
#[derive(Debug, Clone)]
pub struct SeedScan {
    pub project_id: String,
    pub branch: String,
    pub commit_id: String,
    pub status: ScanStatus,
    pub fast: bool,
    pub results: usize,
    pub break_build: bool,
}

impl SeedScan {
    pub fn completed(project_id: &str, commit_id: &str, fast: bool) -> Self {
        Self {
            project_id: project_id.to_string(),
            branch: "main".to_string(),
            commit_id: commit_id.to_string(),
            status: ScanStatus::Completed,
            fast,
            results: 0,
            break_build: false,
        }
    }

    pub fn with_status(mut self, status: ScanStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_results(mut self, results: usize) -> Self {
        self.results = results;
        self
    }

    pub fn breaking_build(mut self) -> Self {
        self.break_build = true;
        self
    }
}

struct StoredScan {
    scan: Scan,
    sequence: u64,
    script: VecDeque<ScanStatus>,
}

#[derive(Default)]
struct PlatformState {
    next_id: u64,
    applications: Vec<Application>,
    projects: Vec<Project>,
    scans: Vec<StoredScan>,
    default_settings: Vec<ConfigurationSetting>,
    project_settings: HashMap<String, Vec<ConfigurationSetting>>,
    scan_settings: HashMap<String, Vec<ConfigurationSetting>>,
    results: HashMap<String, ScanResults>,
    policy_violations: HashMap<String, bool>,
    uploads: Vec<UploadRecord>,
    triggers: Vec<TriggerRecord>,
    configuration_updates: Vec<(String, Vec<ConfigurationSetting>)>,
    cancelled: Vec<String>,
}

impl PlatformState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    fn store_scan(&mut self, scan: Scan, script: VecDeque<ScanStatus>) {
        self.next_id += 1;
        let sequence = self.next_id;
        self.scans.push(StoredScan {
            scan,
            sequence,
            script,
        });
    }
}

/// Scripted in-memory implementation of [`RemoteScanClient`]
pub struct InMemoryScanClient {
    state: Mutex<PlatformState>,
    failures: Mutex<HashSet<FailPoint>>,
    calls: Mutex<HashMap<FailPoint, usize>>,
    progression: Vec<ScanStatus>,
    poll_policy: PollPolicy,
}

impl Default for InMemoryScanClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryScanClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            failures: Mutex::new(HashSet::new()),
            calls: Mutex::new(HashMap::new()),
            progression: vec![ScanStatus::Running, ScanStatus::Completed],
            poll_policy: PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 50,
            },
        }
    }

    /// Statuses a triggered scan moves through, one per read
    pub fn with_progression(mut self, progression: Vec<ScanStatus>) -> Self {
        self.progression = progression;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Default settings every project reports unless overridden
    pub fn with_default_settings(self, settings: Vec<ConfigurationSetting>) -> Self {
        self.lock_state().default_settings = settings;
        self
    }

    pub fn fail_on(&self, point: FailPoint) {
        lock(&self.failures).insert(point);
    }

    pub fn recover(&self, point: FailPoint) {
        lock(&self.failures).remove(&point);
    }

    /// Number of times an operation was invoked
    pub fn calls(&self, point: FailPoint) -> usize {
        lock(&self.calls).get(&point).copied().unwrap_or(0)
    }

    pub fn insert_application(&self, name: &str) -> Application {
        let mut state = self.lock_state();
        let application = Application {
            application_id: state.next_id("app"),
            name: name.to_string(),
            project_ids: Vec::new(),
        };
        state.applications.push(application.clone());
        application
    }

    pub fn insert_project(&self, name: &str) -> Project {
        let mut state = self.lock_state();
        let project = Project {
            project_id: state.next_id("proj"),
            name: name.to_string(),
            groups: Vec::new(),
            tags: BTreeMap::new(),
        };
        state.projects.push(project.clone());
        project
    }

    pub fn set_project_settings(&self, project_id: &str, settings: Vec<ConfigurationSetting>) {
        self.lock_state()
            .project_settings
            .insert(project_id.to_string(), settings);
    }

    /// Place a scan directly; later seeds are newer
    pub fn seed_scan(&self, seed: SeedScan) -> Scan {
        let mut state = self.lock_state();
        let scan_id = state.next_id("scan");
        let now = chrono::Utc::now().to_rfc3339();
        let scan = Scan {
            scan_id: scan_id.clone(),
            project_id: seed.project_id,
            branch: seed.branch,
            status: seed.status,
            tags: BTreeMap::from([(COMMIT_ID_TAG.to_string(), seed.commit_id)]),
            created_at: now.clone(),
            updated_at: now,
        };
        state.scan_settings.insert(
            scan_id.clone(),
            vec![ConfigurationSetting::new(
                "sast",
                "fastScanMode",
                if seed.fast { "true" } else { "false" },
            )],
        );
        state.results.insert(
            scan_id.clone(),
            ScanResults {
                items: (0..seed.results)
                    .map(|i| serde_json::json!({ "id": format!("finding-{}", i) }))
                    .collect(),
            },
        );
        state
            .policy_violations
            .insert(scan_id, seed.break_build);
        state.store_scan(scan.clone(), VecDeque::new());
        scan
    }

    pub fn set_scan_settings(&self, scan_id: &str, settings: Vec<ConfigurationSetting>) {
        self.lock_state()
            .scan_settings
            .insert(scan_id.to_string(), settings);
    }

    pub fn set_policy_violation(&self, scan_id: &str, violated: bool) {
        self.lock_state()
            .policy_violations
            .insert(scan_id.to_string(), violated);
    }

    pub fn applications(&self) -> Vec<Application> {
        self.lock_state().applications.clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.lock_state().projects.clone()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.lock_state().uploads.clone()
    }

    pub fn triggers(&self) -> Vec<TriggerRecord> {
        self.lock_state().triggers.clone()
    }

    pub fn configuration_updates(&self) -> Vec<(String, Vec<ConfigurationSetting>)> {
        self.lock_state().configuration_updates.clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.lock_state().cancelled.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, PlatformState> {
        lock(&self.state)
    }

    // Count the call and apply any configured failure
    fn enter(&self, point: FailPoint) -> ClientResult<()> {
        *lock(&self.calls).entry(point).or_insert(0) += 1;
        if lock(&self.failures).contains(&point) {
            return Err(ClientError::request(
                point.as_ref(),
                "injected failure from in-memory platform",
            ));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RemoteScanClient for InMemoryScanClient {
    async fn get_application_by_name(&self, name: &str) -> ClientResult<Option<Application>> {
        self.enter(FailPoint::GetApplication)?;
        Ok(self
            .lock_state()
            .applications
            .iter()
            .find(|app| app.name == name)
            .cloned())
    }

    async fn create_application(&self, name: &str) -> ClientResult<Application> {
        self.enter(FailPoint::CreateApplication)?;
        Ok(self.insert_application(name))
    }

    async fn update_application(&self, application: &Application) -> ClientResult<()> {
        self.enter(FailPoint::UpdateApplication)?;
        let mut state = self.lock_state();
        let stored = state
            .applications
            .iter_mut()
            .find(|app| app.application_id == application.application_id)
            .ok_or_else(|| ClientError::NotFound {
                entity: "application",
                id: application.application_id.clone(),
            })?;
        *stored = application.clone();
        Ok(())
    }

    async fn get_projects_by_name(&self, name: &str) -> ClientResult<Vec<Project>> {
        self.enter(FailPoint::GetProjects)?;
        Ok(self
            .lock_state()
            .projects
            .iter()
            .filter(|project| project.name == name)
            .cloned()
            .collect())
    }

    async fn create_project(
        &self,
        name: &str,
        groups: &[String],
        tags: &BTreeMap<String, String>,
    ) -> ClientResult<Project> {
        self.enter(FailPoint::CreateProject)?;
        let mut project = self.insert_project(name);
        project.groups = groups.to_vec();
        project.tags = tags.clone();
        let mut state = self.lock_state();
        if let Some(stored) = state
            .projects
            .iter_mut()
            .find(|p| p.project_id == project.project_id)
        {
            *stored = project.clone();
        }
        Ok(project)
    }

    async fn get_scan_by_id(&self, scan_id: &str) -> ClientResult<Scan> {
        self.enter(FailPoint::GetScan)?;
        let mut state = self.lock_state();
        let stored = state
            .scans
            .iter_mut()
            .find(|stored| stored.scan.scan_id == scan_id)
            .ok_or_else(|| ClientError::NotFound {
                entity: "scan",
                id: scan_id.to_string(),
            })?;
        if let Some(next) = stored.script.pop_front() {
            stored.scan.status = next;
            stored.scan.updated_at = chrono::Utc::now().to_rfc3339();
        }
        Ok(stored.scan.clone())
    }

    async fn get_last_scans_filtered(&self, filter: &ScanFilter) -> ClientResult<Vec<Scan>> {
        self.enter(FailPoint::ListScans)?;
        let state = self.lock_state();
        let mut matching: Vec<&StoredScan> = state
            .scans
            .iter()
            .filter(|stored| filter.matches(&stored.scan))
            .collect();
        matching.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(matching.into_iter().map(|stored| stored.scan.clone()).collect())
    }

    async fn upload_stream_for_project(
        &self,
        project_id: &str,
        mut stream: UploadStream,
        size: u64,
    ) -> ClientResult<String> {
        self.enter(FailPoint::Upload)?;
        let mut received = Vec::new();
        stream
            .read_to_end(&mut received)
            .await
            .map_err(|e| ClientError::Upload {
                project_id: project_id.to_string(),
                message: e.to_string(),
            })?;

        let mut state = self.lock_state();
        let upload_url = format!("memory://uploads/{}", state.next_id("upload"));
        state.uploads.push(UploadRecord {
            project_id: project_id.to_string(),
            declared_size: size,
            received,
            upload_url: upload_url.clone(),
        });
        Ok(upload_url)
    }

    async fn get_scan_configuration_by_project(
        &self,
        project_id: &str,
    ) -> ClientResult<Vec<ConfigurationSetting>> {
        self.enter(FailPoint::GetDefaultConfiguration)?;
        let state = self.lock_state();
        Ok(state
            .project_settings
            .get(project_id)
            .cloned()
            .unwrap_or_else(|| state.default_settings.clone()))
    }

    async fn update_project_configuration(
        &self,
        project_id: &str,
        settings: &[ConfigurationSetting],
    ) -> ClientResult<()> {
        self.enter(FailPoint::UpdateProjectConfiguration)?;
        let mut state = self.lock_state();
        state
            .configuration_updates
            .push((project_id.to_string(), settings.to_vec()));

        let mut current = state
            .project_settings
            .get(project_id)
            .cloned()
            .unwrap_or_else(|| state.default_settings.clone());
        for setting in settings {
            current.retain(|existing| existing.key != setting.key);
            current.push(setting.clone());
        }
        state.project_settings.insert(project_id.to_string(), current);
        Ok(())
    }

    async fn trigger_zip_scan(
        &self,
        project_id: &str,
        upload_url: &str,
        branch: &str,
        configurations: &[ScanConfiguration],
        tags: &BTreeMap<String, String>,
    ) -> ClientResult<Scan> {
        self.enter(FailPoint::Trigger)?;
        let mut state = self.lock_state();
        state.triggers.push(TriggerRecord {
            project_id: project_id.to_string(),
            upload_url: upload_url.to_string(),
            branch: branch.to_string(),
            configurations: configurations.to_vec(),
            tags: tags.clone(),
        });

        let scan_id = state.next_id("scan");
        let now = chrono::Utc::now().to_rfc3339();
        let scan = Scan {
            scan_id: scan_id.clone(),
            project_id: project_id.to_string(),
            branch: branch.to_string(),
            status: ScanStatus::Queued,
            tags: tags.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        let ran_with = configurations
            .iter()
            .flat_map(|config| {
                config.values.iter().map(|(name, value)| {
                    ConfigurationSetting::new(&config.scan_type, name, value)
                })
            })
            .collect();
        state.scan_settings.insert(scan_id.clone(), ran_with);
        state.results.insert(scan_id, ScanResults::default());
        state.store_scan(scan.clone(), self.progression.iter().cloned().collect());
        Ok(scan)
    }

    fn poll_policy(&self) -> PollPolicy {
        self.poll_policy.clone()
    }

    async fn get_all_scan_results(&self, scan_id: &str) -> ClientResult<ScanResults> {
        self.enter(FailPoint::GetResults)?;
        Ok(self
            .lock_state()
            .results
            .get(scan_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_scan_configuration(
        &self,
        _project_id: &str,
        scan_id: &str,
    ) -> ClientResult<Vec<ConfigurationSetting>> {
        self.enter(FailPoint::GetScanConfiguration)?;
        Ok(self
            .lock_state()
            .scan_settings
            .get(scan_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn retrieve_policy_violation(
        &self,
        _project_id: &str,
        scan_id: &str,
    ) -> ClientResult<bool> {
        self.enter(FailPoint::PolicyViolation)?;
        Ok(self
            .lock_state()
            .policy_violations
            .get(scan_id)
            .copied()
            .unwrap_or(false))
    }

    async fn cancel_scan(&self, scan_id: &str) -> ClientResult<()> {
        self.enter(FailPoint::Cancel)?;
        let mut state = self.lock_state();
        let stored = state
            .scans
            .iter_mut()
            .find(|stored| stored.scan.scan_id == scan_id)
            .ok_or_else(|| ClientError::NotFound {
                entity: "scan",
                id: scan_id.to_string(),
            })?;
        if !stored.scan.status.is_terminal() {
            stored.scan.status = ScanStatus::Canceled;
            stored.script.clear();
        }
        state.cancelled.push(scan_id.to_string());
        Ok(())
    }
}
