//! Config Store - 점(.) 경로 기반 설정 저장소
//!
//! 설정은 하나의 JSON 트리로 관리되며 `plugins.enabled` 같은
//! 점 경로로 읽고 씁니다. 로드 시 기본값 위에 깊은 병합(deep merge)됩니다.

use crate::storage::JsonStore;
use crate::Result;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 설정 파일명
pub const TICKR_CONFIG_FILE: &str = "config.json";

// ============================================================================
// ConfigAccess - 주입 가능한 설정 인터페이스
// ============================================================================

/// 설정 접근 인터페이스
///
/// 플러그인 서브시스템은 설정 영속화를 직접 구현하지 않고
/// 이 trait을 통해 주입받은 저장소를 사용합니다.
pub trait ConfigAccess: Send + Sync {
    /// 점 경로로 값 조회
    fn get(&self, key: &str) -> Option<Value>;

    /// 점 경로로 값 설정 (중간 객체는 자동 생성)
    fn set(&self, key: &str, value: Value);

    /// 현재 설정을 영속화
    fn save(&self) -> Result<()>;

    /// 기본값과 함께 조회
    fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }
}

/// 기본 설정 트리
pub fn default_config() -> Value {
    json!({
        "plugins": {
            "enabled": [],
            "configs": {},
        },
        "general": {
            "check_updates": true,
        },
    })
}

// ============================================================================
// ConfigStore
// ============================================================================

/// JSON 파일 기반 설정 저장소
pub struct ConfigStore {
    /// 설정 트리
    data: RwLock<Value>,

    /// 저장 위치 (None이면 메모리 전용)
    location: Option<(JsonStore, String)>,
}

impl ConfigStore {
    /// 메모리 전용 저장소 (테스트, 임베딩용)
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(default_config()),
            location: None,
        }
    }

    /// 파일에서 로드 (없으면 기본값으로 생성)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| TICKR_CONFIG_FILE.to_string());

        let json_store = JsonStore::new(dir);
        let mut data = default_config();

        match json_store.load_optional::<Value>(&filename) {
            Ok(Some(loaded)) => merge(&mut data, loaded),
            Ok(None) => debug!("Config file {:?} not found, using defaults", path),
            Err(e) => warn!("Failed to load config {:?}, using defaults: {}", path, e),
        }

        let store = Self {
            data: RwLock::new(data),
            location: Some((json_store, filename)),
        };

        if !path.exists() {
            store.save()?;
        }

        Ok(store)
    }

    /// 글로벌 설정 파일 로드 (<config_dir>/tickr/config.json)
    pub fn load_global() -> Result<Self> {
        let store = JsonStore::global()?;
        Self::load(store.file_path(TICKR_CONFIG_FILE))
    }

    /// 설정 파일 경로
    pub fn path(&self) -> Option<PathBuf> {
        self.location
            .as_ref()
            .map(|(store, filename)| store.file_path(filename))
    }

    /// 전체 트리 스냅샷
    pub fn snapshot(&self) -> Value {
        self.data.read().clone()
    }

    /// 기본값으로 초기화
    pub fn reset(&self) -> Result<()> {
        *self.data.write() = default_config();
        self.save()
    }
}

impl ConfigAccess for ConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        let data = self.data.read();
        let mut current = &*data;
        for part in key.split('.') {
            current = current.as_object()?.get(part)?;
        }
        Some(current.clone())
    }

    fn set(&self, key: &str, value: Value) {
        let mut data = self.data.write();
        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return;
        };

        let mut current = &mut *data;
        for part in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return;
            };
            current = map.entry(part.to_string()).or_insert_with(|| json!({}));
        }

        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Some(obj) = current.as_object_mut() {
            obj.insert(last.to_string(), value);
        }
    }

    fn save(&self) -> Result<()> {
        match &self.location {
            Some((store, filename)) => {
                let data = self.data.read();
                store.save(filename, &*data)
            }
            None => Ok(()),
        }
    }
}

/// `overlay`를 `base` 위에 깊은 병합
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dotted_get_set() {
        let store = ConfigStore::in_memory();

        assert_eq!(store.get("plugins.enabled"), Some(json!([])));
        assert_eq!(store.get("plugins.missing.deep"), None);

        store.set("window.size.width", json!(400));
        assert_eq!(store.get("window.size.width"), Some(json!(400)));
        assert_eq!(store.get_or("window.size.height", json!(200)), json!(200));
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let store = ConfigStore::in_memory();
        store.set("general.check_updates", json!(true));
        store.set("general.check_updates.interval", json!(3600));

        assert_eq!(store.get("general.check_updates.interval"), Some(json!(3600)));
    }

    #[test]
    fn test_load_merges_over_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"plugins": {"enabled": ["hello"]}}"#).unwrap();

        let store = ConfigStore::load(&path).unwrap();

        assert_eq!(store.get("plugins.enabled"), Some(json!(["hello"])));
        // 기본값은 유지
        assert_eq!(store.get("plugins.configs"), Some(json!({})));
        assert_eq!(store.get("general.check_updates"), Some(json!(true)));
    }

    #[test]
    fn test_save_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        let store = ConfigStore::load(&path).unwrap();
        assert!(path.exists());

        store.set("plugins.enabled", json!(["stopwatch"]));
        store.save().unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.get("plugins.enabled"), Some(json!(["stopwatch"])));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = ConfigStore::load(&path).unwrap();
        assert_eq!(store.get("plugins.enabled"), Some(json!([])));
    }
}
