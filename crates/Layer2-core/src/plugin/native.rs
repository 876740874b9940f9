//! Native Plugin ABI - 동적 라이브러리 플러그인 바인딩
//!
//! 플러그인 라이브러리는 [`declare_plugin!`]으로 `TICKR_PLUGIN` 선언을
//! 내보냅니다. 선언이 없거나 호환되지 않으면 레거시 생성자 심볼을
//! 순서대로 찾습니다.
//!
//! ```ignore
//! use tickr_core::{declare_plugin, Plugin, PluginContext, PluginInfo};
//!
//! #[derive(Default)]
//! pub struct Weather;
//!
//! impl Plugin for Weather {
//!     fn info(&self) -> PluginInfo { PluginInfo::new("weather", "1.0.0") }
//!     fn initialize(&mut self, _ctx: &PluginContext) -> bool { true }
//! }
//!
//! declare_plugin!("weather", Weather::default());
//! ```
//!
//! 플러그인과 호스트는 같은 컴파일러/같은 `tickr-core` 버전으로 빌드되어야
//! 합니다. `core_version`이 다르면 바인딩을 거부합니다.

use super::traits::Plugin;
use libloading::Library;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// 플러그인 선언 ABI 버전
pub const ABI_VERSION: u32 = 1;

/// 플러그인이 빌드된 `tickr-core` 버전
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 선언 심볼 이름
pub const DECLARATION_SYMBOL: &[u8] = b"TICKR_PLUGIN\0";

/// 레거시 생성자 심볼 (순서대로 탐색)
pub const LEGACY_CONSTRUCTORS: &[&[u8]] = &[b"tickr_plugin_create\0", b"_plugin_create\0"];

/// 누락된 의존 라이브러리 사전 로드 최대 횟수
const MAX_DEPENDENCY_PRELOADS: usize = 8;

/// 플러그인 인스턴스 생성 함수
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// 레거시 생성자 시그니처
pub type PluginConstructor = fn() -> Box<dyn Plugin>;

// ============================================================================
// PluginDeclaration
// ============================================================================

/// 플러그인 라이브러리가 내보내는 선언
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub abi_version: u32,
    pub core_version: &'static str,
    pub name: &'static str,
    pub create: PluginConstructor,
}

/// 플러그인 선언 매크로
///
/// `$ctor`는 호출될 때마다 새 인스턴스를 만드는 표현식입니다.
#[macro_export]
macro_rules! declare_plugin {
    ($name:expr, $ctor:expr) => {
        #[no_mangle]
        pub static TICKR_PLUGIN: $crate::plugin::PluginDeclaration =
            $crate::plugin::PluginDeclaration {
                abi_version: $crate::plugin::ABI_VERSION,
                core_version: $crate::plugin::CORE_VERSION,
                name: $name,
                create: {
                    fn __tickr_create() -> ::std::boxed::Box<dyn $crate::plugin::Plugin> {
                        ::std::boxed::Box::new($ctor)
                    }
                    __tickr_create
                },
            };
    };
}

// ============================================================================
// BindError
// ============================================================================

/// 바인딩 실패 진단
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("Plugin '{0}' not found in any plugin directory")]
    NotFound(String),

    #[error(
        "Failed to load {}: {message}{}",
        .path.display(),
        missing_dependency_suffix(.missing_dependency)
    )]
    LoadFailed {
        path: PathBuf,
        message: String,
        missing_dependency: Option<String>,
    },

    #[error("{} does not export a plugin entry point", .path.display())]
    NoEntryPoint { path: PathBuf },

    #[error(
        "{} was built for ABI {found_abi} / core {found_core}, host expects ABI {} / core {}",
        .path.display(),
        ABI_VERSION,
        CORE_VERSION
    )]
    IncompatibleAbi {
        path: PathBuf,
        found_abi: u32,
        found_core: String,
    },
}

fn missing_dependency_suffix(missing: &Option<String>) -> String {
    match missing {
        Some(dep) => format!(" (missing dependency: {})", dep),
        None => String::new(),
    }
}

impl From<BindError> for tickr_foundation::Error {
    fn from(e: BindError) -> Self {
        match e {
            BindError::NotFound(name) => tickr_foundation::Error::NotFound(name),
            other => tickr_foundation::Error::PluginLoad(other.to_string()),
        }
    }
}

// ============================================================================
// LoadedModule / ModuleOpener
// ============================================================================

/// 열린 코드 단위
///
/// 필드 순서대로 해제되므로 플러그인 라이브러리가 의존 라이브러리보다
/// 먼저 닫힙니다.
pub struct LoadedModule {
    /// 인스턴스 생성 함수
    pub factory: PluginFactory,

    /// 선언에 기록된 이름
    pub declared_name: Option<String>,

    /// 플러그인 라이브러리
    pub library: Option<Library>,

    /// 사전 로드한 의존 라이브러리
    pub dependencies: Vec<Library>,
}

impl LoadedModule {
    /// 라이브러리 없이 팩토리만으로 생성
    pub fn from_factory(factory: PluginFactory) -> Self {
        Self {
            factory,
            declared_name: None,
            library: None,
            dependencies: Vec::new(),
        }
    }
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("declared_name", &self.declared_name)
            .field("native", &self.library.is_some())
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

/// 코드 단위를 여는 방법
pub trait ModuleOpener: Send + Sync {
    /// `path`를 열고 플러그인 팩토리를 찾음
    ///
    /// `dependency_dirs`는 누락된 의존 라이브러리를 찾을 추가 위치입니다.
    fn open(&self, path: &Path, dependency_dirs: &[PathBuf]) -> Result<LoadedModule, BindError>;
}

// ============================================================================
// NativeOpener
// ============================================================================

/// `libloading` 기반 오프너
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeOpener;

impl ModuleOpener for NativeOpener {
    fn open(&self, path: &Path, dependency_dirs: &[PathBuf]) -> Result<LoadedModule, BindError> {
        let mut dependencies: Vec<Library> = Vec::new();
        let mut preloaded: Vec<String> = Vec::new();

        let library = loop {
            // SAFETY: 플러그인은 호스트 권한으로 실행되는 신뢰된 코드입니다.
            match unsafe { Library::new(path) } {
                Ok(library) => break library,
                Err(e) => {
                    let message = e.to_string();
                    let missing = missing_dependency(&message, path);

                    let retry = missing.as_deref().and_then(|dep| {
                        if preloaded.len() >= MAX_DEPENDENCY_PRELOADS
                            || preloaded.iter().any(|p| p == dep)
                        {
                            return None;
                        }
                        find_dependency(dep, dependency_dirs)
                    });

                    match (missing, retry) {
                        (Some(dep), Some(dep_path)) => {
                            debug!("Preloading {} for {}", dep_path.display(), path.display());
                            // SAFETY: 위와 동일
                            match unsafe { Library::new(&dep_path) } {
                                Ok(dep_lib) => {
                                    dependencies.push(dep_lib);
                                    preloaded.push(dep);
                                }
                                Err(dep_err) => {
                                    return Err(BindError::LoadFailed {
                                        path: path.to_path_buf(),
                                        message: format!("{} ({})", message, dep_err),
                                        missing_dependency: Some(dep),
                                    })
                                }
                            }
                        }
                        (missing_dependency, _) => {
                            return Err(BindError::LoadFailed {
                                path: path.to_path_buf(),
                                message,
                                missing_dependency,
                            })
                        }
                    }
                }
            }
        };

        let mut module = resolve_entry(library, path)?;
        module.dependencies = dependencies;
        info!("Opened native plugin {}", path.display());
        Ok(module)
    }
}

/// 열린 라이브러리에서 엔트리 포인트 찾기
fn resolve_entry(library: Library, path: &Path) -> Result<LoadedModule, BindError> {
    let mut incompatible = None;

    // SAFETY: `TICKR_PLUGIN`은 `declare_plugin!`이 만든 `PluginDeclaration` 정적 변수입니다.
    let declaration = unsafe {
        library
            .get::<*const PluginDeclaration>(DECLARATION_SYMBOL)
            .ok()
            .map(|symbol| (*symbol).read())
    };

    if let Some(decl) = declaration {
        if decl.abi_version == ABI_VERSION && decl.core_version == CORE_VERSION {
            let create = decl.create;
            return Ok(LoadedModule {
                factory: Arc::new(move || create()),
                declared_name: Some(decl.name.to_string()),
                library: Some(library),
                dependencies: Vec::new(),
            });
        }
        incompatible = Some(BindError::IncompatibleAbi {
            path: path.to_path_buf(),
            found_abi: decl.abi_version,
            found_core: decl.core_version.to_string(),
        });
    }

    for symbol in LEGACY_CONSTRUCTORS {
        // SAFETY: 레거시 생성자는 `PluginConstructor` 시그니처로 내보내집니다.
        let constructor = unsafe { library.get::<PluginConstructor>(symbol).ok().map(|s| *s) };
        if let Some(create) = constructor {
            debug!("Using legacy constructor in {}", path.display());
            return Ok(LoadedModule {
                factory: Arc::new(move || create()),
                declared_name: None,
                library: Some(library),
                dependencies: Vec::new(),
            });
        }
    }

    Err(incompatible.unwrap_or_else(|| BindError::NoEntryPoint {
        path: path.to_path_buf(),
    }))
}

/// 로더 진단 메시지에서 누락된 의존 라이브러리 이름 추출
pub(crate) fn missing_dependency(message: &str, path: &Path) -> Option<String> {
    const ELF_MARKER: &str = ": cannot open shared object file";
    const MACH_MARKER: &str = "Library not loaded: ";

    let candidate = if let Some(idx) = message.find(ELF_MARKER) {
        message[..idx].rsplit(": ").next()
    } else if let Some(idx) = message.find(MACH_MARKER) {
        message[idx + MACH_MARKER.len()..].lines().next()
    } else {
        None
    }?;

    let name = Path::new(candidate.trim()).file_name()?.to_string_lossy().to_string();
    let own = path.file_name().map(|n| n.to_string_lossy().to_string());
    if name.is_empty() || own.as_deref() == Some(name.as_str()) {
        return None;
    }
    Some(name)
}

fn find_dependency(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().map(|dir| dir.join(name)).find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dependency_elf() {
        let path = Path::new("/plugins/weather/libweather.so");
        let message = "libcurl.so.4: cannot open shared object file: No such file or directory";
        assert_eq!(missing_dependency(message, path), Some("libcurl.so.4".into()));

        let message = "/plugins/weather/libweather.so: libcurl.so.4: cannot open shared object file: No such file or directory";
        assert_eq!(missing_dependency(message, path), Some("libcurl.so.4".into()));
    }

    #[test]
    fn test_missing_self_is_not_a_dependency() {
        let path = Path::new("/plugins/weather/libweather.so");
        let message = "/plugins/weather/libweather.so: cannot open shared object file: No such file or directory";
        assert_eq!(missing_dependency(message, path), None);
    }

    #[test]
    fn test_missing_dependency_mach() {
        let path = Path::new("/plugins/libweather.dylib");
        let message = "dlopen(/plugins/libweather.dylib, 5): Library not loaded: @rpath/libfoo.dylib\n  Referenced from: x";
        assert_eq!(missing_dependency(message, path), Some("libfoo.dylib".into()));
    }

    #[test]
    fn test_unrelated_message() {
        assert_eq!(missing_dependency("invalid ELF header", Path::new("x.so")), None);
    }

    #[test]
    fn test_open_missing_file_fails_with_diagnostic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(libloading::library_filename("absent"));
        let err = NativeOpener.open(&path, &[]).unwrap_err();
        assert!(matches!(err, BindError::LoadFailed { .. }));
        assert!(err.to_string().contains("Failed to load"));
    }

    #[test]
    fn test_bind_error_conversion() {
        let err: tickr_foundation::Error = BindError::NotFound("x".into()).into();
        assert!(matches!(err, tickr_foundation::Error::NotFound(_)));

        let err: tickr_foundation::Error = BindError::NoEntryPoint {
            path: PathBuf::from("/p/libx.so"),
        }
        .into();
        assert!(matches!(err, tickr_foundation::Error::PluginLoad(_)));
    }

    #[test]
    fn test_load_failed_mentions_dependency() {
        let err = BindError::LoadFailed {
            path: PathBuf::from("/p/libx.so"),
            message: "boom".into(),
            missing_dependency: Some("libdep.so".into()),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load /p/libx.so: boom (missing dependency: libdep.so)"
        );
    }
}
