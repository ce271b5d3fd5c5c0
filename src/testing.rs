//! In-memory fakes for every port, shared by the unit tests.
//!
//! Each fake is a cheap `Clone` handle over shared state, so a test keeps
//! one handle for assertions and boxes another into a [`ServiceContext`].

use std::collections::{BTreeMap, VecDeque};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::catalog::PartitionKind;
use crate::context::ServiceContext;
use crate::ports::{
    AddedPartition, AssetFetcher, Clock, CommandOutcome, CommandRunner, CommandSpec, DiskImager,
    DomainState, FileSystem, Hypervisor, ReleaseDiscovery,
};

type PortResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Parses an RFC 3339 timestamp.
pub(crate) fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

// --- clock ---

#[derive(Clone)]
pub(crate) struct FixedClock(Arc<Mutex<DateTime<Utc>>>);

impl FixedClock {
    pub(crate) fn at(raw: &str) -> Self {
        Self(Arc::new(Mutex::new(ts(raw))))
    }

    pub(crate) fn now_value(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now_value()
    }
}

// --- filesystem ---

#[derive(Debug, Clone)]
struct MemFile {
    content: String,
    mtime: DateTime<Utc>,
    world_readable: bool,
}

/// Flat map of path to file; directories exist implicitly.
#[derive(Clone, Default)]
pub(crate) struct MemFs(Arc<Mutex<BTreeMap<PathBuf, MemFile>>>);

impl MemFs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, path: impl Into<PathBuf>, content: &str) {
        self.add_with_mtime(path, content, ts("2024-01-01T00:00:00Z"));
    }

    pub(crate) fn add_with_mtime(
        &self,
        path: impl Into<PathBuf>,
        content: &str,
        mtime: DateTime<Utc>,
    ) {
        let file = MemFile { content: content.to_string(), mtime, world_readable: false };
        self.0.lock().unwrap().insert(path.into(), file);
    }

    pub(crate) fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.0.lock().unwrap().contains_key(path.as_ref())
    }

    pub(crate) fn is_world_readable(&self, path: impl AsRef<Path>) -> bool {
        self.0.lock().unwrap().get(path.as_ref()).is_some_and(|f| f.world_readable)
    }

    /// Names of the files directly inside `dir`.
    pub(crate) fn names_in(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let dir = dir.as_ref();
        self.0
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect()
    }
}

fn not_found(path: &Path) -> Box<dyn Error + Send + Sync> {
    format!("{}: no such file", path.display()).into()
}

impl FileSystem for MemFs {
    fn read_to_string(&self, path: &Path) -> PortResult<String> {
        self.0.lock().unwrap().get(path).map(|f| f.content.clone()).ok_or_else(|| not_found(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.contains(path)
    }

    fn list_dir(&self, path: &Path) -> PortResult<Vec<String>> {
        Ok(self.names_in(path))
    }

    fn modified(&self, path: &Path) -> PortResult<DateTime<Utc>> {
        self.0.lock().unwrap().get(path).map(|f| f.mtime).ok_or_else(|| not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> PortResult<()> {
        let mut files = self.0.lock().unwrap();
        let file = files.remove(from).ok_or_else(|| not_found(from))?;
        files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> PortResult<()> {
        self.0.lock().unwrap().remove(path).map(drop).ok_or_else(|| not_found(path))
    }

    fn make_world_readable(&self, path: &Path) -> PortResult<()> {
        let mut files = self.0.lock().unwrap();
        let file = files.get_mut(path).ok_or_else(|| not_found(path))?;
        file.world_readable = true;
        Ok(())
    }
}

// --- release discovery ---

#[derive(Default)]
struct ReleaseState {
    stable: u32,
    branched: Option<u32>,
    fail: bool,
}

#[derive(Clone, Default)]
pub(crate) struct StaticReleases {
    state: Arc<Mutex<ReleaseState>>,
    stable_calls: Arc<AtomicUsize>,
    branched_calls: Arc<AtomicUsize>,
    next_calls: Arc<AtomicUsize>,
}

impl StaticReleases {
    pub(crate) fn new() -> Self {
        let releases = Self::default();
        releases.set(39, None);
        releases
    }

    pub(crate) fn set(&self, stable: u32, branched: Option<u32>) {
        let mut state = self.state.lock().unwrap();
        state.stable = stable;
        state.branched = branched;
    }

    pub(crate) fn fail(&self) {
        self.state.lock().unwrap().fail = true;
    }

    pub(crate) fn stable_calls(&self) -> usize {
        self.stable_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn branched_calls(&self) -> usize {
        self.branched_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn next_calls(&self) -> usize {
        self.next_calls.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> PortResult<(u32, Option<u32>)> {
        let state = self.state.lock().unwrap();
        if state.fail {
            return Err("release metadata unavailable".into());
        }
        Ok((state.stable, state.branched))
    }
}

impl ReleaseDiscovery for StaticReleases {
    fn stable_release(&self) -> PortResult<u32> {
        self.stable_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot()?.0)
    }

    fn branched_release(&self) -> PortResult<Option<u32>> {
        self.branched_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot()?.1)
    }

    fn next_release(&self) -> PortResult<u32> {
        self.next_calls.fetch_add(1, Ordering::SeqCst);
        let (stable, branched) = self.snapshot()?;
        Ok(stable.max(branched.unwrap_or(0)) + 1)
    }
}

// --- hypervisor ---

struct HypervisorState {
    domain: Option<DomainState>,
    after_install: Option<DomainState>,
    undefine_error: Option<String>,
    ops: Vec<String>,
}

#[derive(Clone)]
pub(crate) struct FakeHypervisor(Arc<Mutex<HypervisorState>>);

impl FakeHypervisor {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(HypervisorState {
            domain: None,
            after_install: Some(DomainState::ShutOff),
            undefine_error: None,
            ops: Vec::new(),
        })))
    }

    pub(crate) fn set_domain(&self, state: Option<DomainState>) {
        self.0.lock().unwrap().domain = state;
    }

    /// State the domain is left in when an install finishes.
    pub(crate) fn set_after_install(&self, state: Option<DomainState>) {
        self.0.lock().unwrap().after_install = state;
    }

    /// Makes every `undefine` fail with `message`.
    pub(crate) fn fail_undefine(&self, message: &str) {
        self.0.lock().unwrap().undefine_error = Some(message.to_string());
    }

    pub(crate) fn domain(&self) -> Option<DomainState> {
        self.0.lock().unwrap().domain
    }

    pub(crate) fn ops(&self) -> Vec<String> {
        self.0.lock().unwrap().ops.clone()
    }

    fn install_finished(&self) {
        let mut state = self.0.lock().unwrap();
        state.domain = state.after_install;
    }
}

impl Hypervisor for FakeHypervisor {
    fn domain_state(&self, name: &str) -> PortResult<Option<DomainState>> {
        let mut state = self.0.lock().unwrap();
        state.ops.push(format!("domstate {name}"));
        Ok(state.domain)
    }

    fn destroy(&self, name: &str) -> PortResult<()> {
        let mut state = self.0.lock().unwrap();
        state.ops.push(format!("destroy {name}"));
        match state.domain {
            None => Err("domain not found".into()),
            Some(DomainState::ShutOff) => Err("domain is not running".into()),
            Some(_) => {
                state.domain = Some(DomainState::ShutOff);
                Ok(())
            }
        }
    }

    fn undefine(&self, name: &str) -> PortResult<()> {
        let mut state = self.0.lock().unwrap();
        state.ops.push(format!("undefine {name}"));
        if let Some(message) = &state.undefine_error {
            return Err(message.clone().into());
        }
        state.domain.take().map(drop).ok_or_else(|| "domain not found".into())
    }
}

// --- command runner ---

struct RunnerState {
    queue: VecDeque<PortResult<CommandOutcome>>,
    fallback: CommandOutcome,
    calls: Vec<(CommandSpec, Option<Duration>)>,
}

/// Serves queued outcomes in order, then repeats a fallback outcome.
///
/// When wired to a [`MemFs`] and [`FakeHypervisor`], a `virt-install`
/// invocation leaves its `--disk` file behind and moves the domain to the
/// hypervisor's post-install state, as the real tool would.
#[derive(Clone)]
pub(crate) struct ScriptedRunner {
    state: Arc<Mutex<RunnerState>>,
    fs: Option<MemFs>,
    hypervisor: Option<FakeHypervisor>,
}

fn exited(code: i32, stdout: &str, stderr: &str) -> CommandOutcome {
    CommandOutcome::Exited { code, stdout: stdout.to_string(), stderr: stderr.to_string() }
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RunnerState {
                queue: VecDeque::new(),
                fallback: exited(0, "", ""),
                calls: Vec::new(),
            })),
            fs: None,
            hypervisor: None,
        }
    }

    pub(crate) fn wired(fs: MemFs, hypervisor: FakeHypervisor) -> Self {
        Self { fs: Some(fs), hypervisor: Some(hypervisor), ..Self::new() }
    }

    pub(crate) fn push_exit(&self, code: i32, stdout: &str, stderr: &str) {
        self.state.lock().unwrap().queue.push_back(Ok(exited(code, stdout, stderr)));
    }

    pub(crate) fn push_timeout(&self) {
        self.state.lock().unwrap().queue.push_back(Ok(CommandOutcome::TimedOut));
    }

    pub(crate) fn push_spawn_error(&self, message: &str) {
        self.state.lock().unwrap().queue.push_back(Err(message.to_string().into()));
    }

    pub(crate) fn set_fallback(&self, outcome: CommandOutcome) {
        self.state.lock().unwrap().fallback = outcome;
    }

    pub(crate) fn always_time_out(&self) {
        self.set_fallback(CommandOutcome::TimedOut);
    }

    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.state.lock().unwrap().calls.iter().map(|(c, _)| c.clone()).collect()
    }

    pub(crate) fn timeouts(&self) -> Vec<Option<Duration>> {
        self.state.lock().unwrap().calls.iter().map(|(_, t)| *t).collect()
    }

    /// Calls whose program is `program`.
    pub(crate) fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls().into_iter().filter(|c| c.program == program).collect()
    }

    fn simulate_install(&self, command: &CommandSpec) {
        let disk = command
            .args
            .iter()
            .skip_while(|a| *a != "--disk")
            .nth(1)
            .and_then(|spec| spec.split(',').find_map(|kv| kv.strip_prefix("path=")));
        if let (Some(fs), Some(disk)) = (&self.fs, disk) {
            fs.add(disk, "partial install");
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec, timeout: Option<Duration>) -> PortResult<CommandOutcome> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((command.clone(), timeout));
            let fallback = state.fallback.clone();
            state.queue.pop_front().unwrap_or(Ok(fallback))
        };
        if command.program == "virt-install" {
            self.simulate_install(command);
            if let (Ok(CommandOutcome::Exited { code: 0, .. }), Some(hv)) = (&outcome, &self.hypervisor)
            {
                hv.install_finished();
            }
        }
        outcome
    }
}

// --- disk imager ---

#[derive(Default)]
struct ImagerState {
    ops: Vec<String>,
    partitions: Vec<String>,
    fail_on: Option<String>,
}

/// Logs every call and fails on request at a named method.
#[derive(Clone)]
pub(crate) struct FakeImager {
    state: Arc<Mutex<ImagerState>>,
    fs: MemFs,
}

impl FakeImager {
    pub(crate) fn new(fs: MemFs) -> Self {
        Self { state: Arc::default(), fs }
    }

    pub(crate) fn fail_on(&self, method: &str) {
        self.state.lock().unwrap().fail_on = Some(method.to_string());
    }

    pub(crate) fn ops(&self) -> Vec<String> {
        self.state.lock().unwrap().ops.clone()
    }

    fn step(&self, method: &str, op: String) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(op);
        if state.fail_on.as_deref() == Some(method) {
            return Err(format!("{method} failed").into());
        }
        Ok(())
    }
}

impl DiskImager for FakeImager {
    fn create_disk(&self, path: &Path, size: u64) -> PortResult<()> {
        self.step("create_disk", format!("create_disk {} {size}", path.display()))?;
        self.fs.add(path, "");
        Ok(())
    }

    fn launch(&self, path: &Path) -> PortResult<String> {
        self.step("launch", format!("launch {}", path.display()))?;
        Ok("/dev/sda".to_string())
    }

    fn part_init(&self, device: &str, label: &str) -> PortResult<()> {
        self.step("part_init", format!("part_init {device} {label}"))
    }

    fn part_add(
        &self,
        device: &str,
        kind: PartitionKind,
        start: i64,
        end: i64,
    ) -> PortResult<AddedPartition> {
        self.step("part_add", format!("part_add {device} {} {start} {end}", kind.code()))?;
        let mut state = self.state.lock().unwrap();
        let number = u32::try_from(state.partitions.len() + 1).unwrap();
        let partition = format!("{device}{number}");
        state.partitions.push(partition.clone());
        Ok(AddedPartition { device: partition, number })
    }

    fn part_set_gpt_type(&self, device: &str, number: u32, guid: &str) -> PortResult<()> {
        self.step("part_set_gpt_type", format!("part_set_gpt_type {device} {number} {guid}"))
    }

    fn mkfs(&self, fstype: &str, partition: &str, label: Option<&str>) -> PortResult<()> {
        let op = match label {
            Some(label) => format!("mkfs {fstype} {partition} label={label}"),
            None => format!("mkfs {fstype} {partition}"),
        };
        self.step("mkfs", op)
    }

    fn list_partitions(&self) -> PortResult<Vec<String>> {
        Ok(self.state.lock().unwrap().partitions.clone())
    }

    fn mount(&self, partition: &str) -> PortResult<()> {
        self.step("mount", format!("mount {partition}"))
    }

    fn write(&self, path: &str, content: &str) -> PortResult<()> {
        self.step("write", format!("write {path} {content}"))
    }

    fn upload(&self, local: &Path, target: &str) -> PortResult<()> {
        if !local.exists() && !self.fs.contains(local) {
            return Err(format!("{}: no such file", local.display()).into());
        }
        let name = local.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
        self.step("upload", format!("upload {name} {target}"))
    }

    fn umount(&self) -> PortResult<()> {
        self.step("umount", "umount".to_string())
    }

    fn shutdown(&self) -> PortResult<()> {
        self.step("shutdown", "shutdown".to_string())
    }
}

// --- asset fetcher ---

#[derive(Clone, Default)]
pub(crate) struct FakeFetcher {
    urls: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl AssetFetcher for FakeFetcher {
    fn download(&self, url: &str, dest: &Path) -> PortResult<()> {
        self.urls.lock().unwrap().push(url.to_string());
        if url.contains("404") {
            return Err(format!("{url}: 404 Not Found").into());
        }
        std::fs::write(dest, "payload")?;
        Ok(())
    }
}

// --- bundle ---

/// One fake per port, wired together.
pub(crate) struct TestPorts {
    pub(crate) clock: FixedClock,
    pub(crate) fs: MemFs,
    pub(crate) runner: ScriptedRunner,
    pub(crate) hypervisor: FakeHypervisor,
    pub(crate) imager: FakeImager,
    pub(crate) releases: StaticReleases,
    pub(crate) fetcher: FakeFetcher,
}

impl TestPorts {
    pub(crate) fn new() -> Self {
        let fs = MemFs::new();
        let hypervisor = FakeHypervisor::new();
        Self {
            clock: FixedClock::at("2024-06-15T12:00:00Z"),
            runner: ScriptedRunner::wired(fs.clone(), hypervisor.clone()),
            imager: FakeImager::new(fs.clone()),
            releases: StaticReleases::new(),
            fetcher: FakeFetcher::default(),
            hypervisor,
            fs,
        }
    }

    pub(crate) fn context(&self) -> ServiceContext {
        ServiceContext::new(
            Box::new(self.clock.clone()),
            Box::new(self.fs.clone()),
            Box::new(self.runner.clone()),
            Box::new(self.hypervisor.clone()),
            Box::new(self.imager.clone()),
            Box::new(self.releases.clone()),
            Box::new(self.fetcher.clone()),
        )
    }
}
