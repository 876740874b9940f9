//! Plugin Loader - 플러그인 탐색 및 바인딩
//!
//! 탐색 순서:
//! 1. 호스트에 컴파일된 내장 플러그인
//! 2. 검색 디렉토리 (앞쪽이 우선)
//!
//! 디렉토리 안에서는 두 가지 형태를 인식합니다.
//! - 패키지: `<dir>/<name>/` + 엔트리 라이브러리 (매니페스트 `entry` 또는 플랫폼 기본 파일명)
//! - 레거시: `<dir>/lib<name>.so` 같은 단일 라이브러리 파일

use super::manifest::PluginManifest;
use super::native::{BindError, LoadedModule, ModuleOpener, NativeOpener, PluginFactory};
use super::traits::{Plugin, PluginInfo};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::env::consts::{DLL_EXTENSION, DLL_PREFIX};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// PluginOrigin / BoundPlugin
// ============================================================================

/// 바인딩된 구현의 출처
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginOrigin {
    /// 호스트 내장
    Builtin,
    /// 패키지 디렉토리
    Package(PathBuf),
    /// 레거시 단일 파일
    Legacy(PathBuf),
}

/// 이름에 바인딩된 플러그인 구현
pub struct BoundPlugin {
    name: String,
    origin: PluginOrigin,
    manifest: Option<PluginManifest>,
    module: LoadedModule,
}

impl BoundPlugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &PluginOrigin {
        &self.origin
    }

    pub fn manifest(&self) -> Option<&PluginManifest> {
        self.manifest.as_ref()
    }

    /// 새 인스턴스 생성
    pub fn instantiate(&self) -> Box<dyn Plugin> {
        (self.module.factory)()
    }

    /// 식별 정보 결정 (매니페스트 값 우선)
    pub fn identity(&self, declared: PluginInfo) -> PluginInfo {
        let Some(manifest) = &self.manifest else {
            return PluginInfo {
                name: self.name.clone(),
                ..declared
            };
        };

        PluginInfo {
            name: self.name.clone(),
            version: manifest.version.clone().unwrap_or(declared.version),
            author: manifest.author.clone().unwrap_or(declared.author),
            description: manifest.description.clone().unwrap_or(declared.description),
        }
    }
}

impl std::fmt::Debug for BoundPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundPlugin")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("module", &self.module)
            .finish()
    }
}

// ============================================================================
// PluginLoader
// ============================================================================

/// 플러그인 로더
pub struct PluginLoader {
    /// 검색 디렉토리 (우선순위 순)
    search_dirs: Vec<PathBuf>,

    /// 내장 플러그인
    builtins: BTreeMap<String, PluginFactory>,

    /// 코드 단위 오프너
    opener: Arc<dyn ModuleOpener>,

    /// 바인딩 캐시
    cache: Mutex<HashMap<String, Arc<BoundPlugin>>>,
}

impl PluginLoader {
    /// 내장 플러그인 + 네이티브 오프너로 생성
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        let mut loader = Self::with_opener(search_dirs, Arc::new(NativeOpener));
        for (name, factory) in super::builtin::factories() {
            loader.register_builtin(name, factory);
        }
        loader
    }

    /// 내장 플러그인 없이 지정 오프너로 생성
    pub fn with_opener(search_dirs: Vec<PathBuf>, opener: Arc<dyn ModuleOpener>) -> Self {
        Self {
            search_dirs,
            builtins: BTreeMap::new(),
            opener,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 내장 플러그인 등록
    pub fn register_builtin(&mut self, name: impl Into<String>, factory: PluginFactory) {
        let name = name.into();
        debug!("Registered builtin plugin: {}", name);
        self.builtins.insert(name, factory);
    }

    /// 빌더 패턴: 내장 플러그인 추가
    pub fn with_builtin(mut self, name: impl Into<String>, factory: PluginFactory) -> Self {
        self.register_builtin(name, factory);
        self
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    pub fn builtin_names(&self) -> Vec<String> {
        self.builtins.keys().cloned().collect()
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// 사용 가능한 플러그인 이름
    pub fn discover(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.builtins.keys().cloned().collect();

        for dir in &self.search_dirs {
            let found = scan_dir(dir);
            debug!("Discovered {} plugin(s) in {}", found.len(), dir.display());
            names.extend(found);
        }

        names
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// 이름에 구현 바인딩 (캐시됨)
    pub fn bind(
        &self,
        name: &str,
        dependency_dirs: &[PathBuf],
    ) -> Result<Arc<BoundPlugin>, BindError> {
        if let Some(bound) = self.cache.lock().get(name) {
            return Ok(Arc::clone(bound));
        }

        let bound = Arc::new(self.resolve(name, dependency_dirs)?);
        info!("Bound plugin {} ({:?})", name, bound.origin);

        let mut cache = self.cache.lock();
        let entry = cache.entry(name.to_string()).or_insert(bound);
        Ok(Arc::clone(entry))
    }

    /// 캐시에서 제거
    ///
    /// 라이브러리는 남아 있는 인스턴스가 모두 해제된 뒤에 닫힙니다.
    pub fn unbind(&self, name: &str) -> bool {
        let removed = self.cache.lock().remove(name).is_some();
        if removed {
            debug!("Unbound plugin {}", name);
        }
        removed
    }

    /// 캐시된 이름 목록
    pub fn cached(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, name: &str, dependency_dirs: &[PathBuf]) -> Result<BoundPlugin, BindError> {
        if !is_valid_name(name) {
            return Err(BindError::NotFound(name.to_string()));
        }

        if let Some(factory) = self.builtins.get(name) {
            return Ok(BoundPlugin {
                name: name.to_string(),
                origin: PluginOrigin::Builtin,
                manifest: None,
                module: LoadedModule::from_factory(Arc::clone(factory)),
            });
        }

        let (origin, entry, manifest) = self
            .locate(name)
            .ok_or_else(|| BindError::NotFound(name.to_string()))?;

        let module = self.opener.open(&entry, dependency_dirs)?;
        if let Some(declared) = &module.declared_name {
            if declared != name {
                warn!(
                    "Plugin at {} declares name '{}', bound as '{}'",
                    entry.display(),
                    declared,
                    name
                );
            }
        }

        Ok(BoundPlugin {
            name: name.to_string(),
            origin,
            manifest,
            module,
        })
    }

    /// 첫 번째로 일치하는 위치 찾기 (패키지 형태 먼저)
    fn locate(&self, name: &str) -> Option<(PluginOrigin, PathBuf, Option<PluginManifest>)> {
        for dir in &self.search_dirs {
            let package = dir.join(name);
            if package.is_dir() {
                let manifest = PluginManifest::from_dir(&package).ok();
                let entry = package_entry(&package, name, manifest.as_ref());
                if entry.is_file() {
                    return Some((PluginOrigin::Package(package), entry, manifest));
                }
            }

            if let Some(file) = legacy_candidates(dir, name).into_iter().find(|p| p.is_file()) {
                return Some((PluginOrigin::Legacy(file.clone()), file, None));
            }
        }
        None
    }
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("search_dirs", &self.search_dirs)
            .field("builtins", &self.builtins.keys().collect::<Vec<_>>())
            .field("cached", &self.cached())
            .finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// 디렉토리/파일 이름으로 쓸 수 있는 플러그인 이름인지
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.starts_with('_')
        && !name.contains(&['/', '\\', ':'][..])
        && name != ".."
}

/// 패키지 엔트리 라이브러리 경로
fn package_entry(package: &Path, name: &str, manifest: Option<&PluginManifest>) -> PathBuf {
    match manifest.and_then(|m| m.entry.as_deref()) {
        Some(entry) => package.join(entry),
        None => package.join(libloading::library_filename(name)),
    }
}

/// 레거시 파일 후보 (`lib<name>.so`, `<name>.so`)
fn legacy_candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut candidates = vec![dir.join(libloading::library_filename(name))];
    let bare = dir.join(format!("{}.{}", name, DLL_EXTENSION));
    if !candidates.contains(&bare) {
        candidates.push(bare);
    }
    candidates
}

/// 한 디렉토리의 플러그인 이름
fn scan_dir(dir: &Path) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Skipping plugin directory {}: {}", dir.display(), e);
            return names;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with('.') || file_name.starts_with('_') {
            continue;
        }

        if path.is_dir() {
            let manifest = PluginManifest::from_dir(&path).ok();
            if package_entry(&path, &file_name, manifest.as_ref()).is_file() {
                names.insert(file_name);
            }
        } else if let Some(name) = legacy_name(&path) {
            names.insert(name);
        }
    }

    names
}

/// 레거시 라이브러리 파일에서 이름 추출
fn legacy_name(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(DLL_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let name = if DLL_PREFIX.is_empty() {
        stem
    } else {
        stem.strip_prefix(DLL_PREFIX).unwrap_or(stem)
    };
    if is_valid_name(name) {
        Some(name.to_string())
    } else {
        None
    }
}
