// i18n.rs
//
// Runtime UI strings:
// - Built-in table compiled in from assets/i18n.json, format { "<lang>": { "key": "value" } }
// - Optional override: assets/i18n/<lang>.json next to the executable or in the working dir
// - Lookup order: selected lang -> fallback en -> key itself
// - tr("key") / tr_with("key", &[("name", ...)]) with {name} placeholders
//
// Language selection: --lang <code>, then env FULLDOME_LANG, then [display].lang.

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "en";
pub const LANG_ENV: &str = "FULLDOME_LANG";

/// (code, native name) for the language menu.
pub const LANGUAGES: [(&str, &str); 2] = [("en", "English"), ("zh-Hans", "简体中文")];

const BUILTIN: &str = include_str!("../assets/i18n.json");

#[derive(Debug, Clone)]
struct I18n {
    map: HashMap<String, String>,
    fallback_map: HashMap<String, String>,
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

type Table = HashMap<String, HashMap<String, String>>;

fn builtin_table() -> &'static Table {
    static TABLE: OnceCell<Table> = OnceCell::new();
    TABLE.get_or_init(|| match serde_json::from_str(BUILTIN) {
        Ok(t) => t,
        Err(e) => {
            log::error!("built-in string table is malformed: {e}");
            HashMap::new()
        }
    })
}

fn load_json_map(path: &Path) -> Option<HashMap<String, String>> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(map) => Some(map),
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            None
        }
    }
}

/// Search <exe_dir>/assets/i18n/<lang>.json, then ./assets/i18n/<lang>.json.
fn find_override_file(lang: &str) -> Option<PathBuf> {
    let rel = Path::new("assets").join("i18n").join(format!("{lang}.json"));

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    exe_dir
        .map(|dir| dir.join(&rel))
        .into_iter()
        .chain(std::iter::once(rel.clone()))
        .find(|p| p.exists())
}

fn load_lang(lang: &str) -> HashMap<String, String> {
    let mut map = builtin_table().get(lang).cloned().unwrap_or_default();
    if let Some(extra) = find_override_file(lang).and_then(|p| load_json_map(&p)) {
        map.extend(extra);
    }
    map
}

/// Initialize global i18n. Later calls replace the active language.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    if !builtin_table().contains_key(&lang) {
        log::warn!("no built-in strings for language {lang:?}, falling back to {FALLBACK_LANG}");
    }

    let map = load_lang(&lang);
    let fallback_map = if lang == FALLBACK_LANG {
        map.clone()
    } else {
        load_lang(FALLBACK_LANG)
    };
    let i = I18n { map, fallback_map };

    if let Some(lock) = I18N.get() {
        if let Ok(mut w) = lock.write() {
            *w = i;
        }
    } else {
        let _ = I18N.set(RwLock::new(i));
    }
}

/// Localized text by key. Missing keys come back unchanged.
pub fn tr(key: &str) -> String {
    let Some(i) = I18N.get().and_then(|l| l.read().ok()) else {
        return key.to_string();
    };

    i.map
        .get(key)
        .or_else(|| i.fallback_map.get(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// Localized text with `{name}` placeholders substituted.
/// Any placeholder not provided is kept as-is.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        s = s.replace(&format!("{{{k}}}"), v);
    }
    s
}

/// CLI flag first, then the environment, then the configured default.
pub fn resolve_lang(cli: Option<&str>, config_default: &str) -> String {
    if let Some(lang) = cli.filter(|l| !l.trim().is_empty()) {
        return lang.to_string();
    }
    if let Ok(v) = std::env::var(LANG_ENV) {
        if !v.trim().is_empty() {
            return v;
        }
    }
    config_default.to_string()
}
