//! 声明式配置
//!
//! 通过 TOML 描述上下文种子和级别覆盖，编译成拦截器的 [`LogOption`]。
//!
//! ```toml
//! [fields]
//! app = "gateway"
//!
//! [methods."/pkg.Svc/Ping"]
//! team = "core"
//!
//! [levels]
//! Unavailable = "error"
//! ```

use crate::code::parse_code;
use crate::error::{ConfigError, Result};
use crate::logger::{Level, LogContext};
use crate::options::{LogOption, default_code_to_level, with_levels, with_logger_context};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tonic::Code;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// 所有调用都带上的字段
    pub fields: BTreeMap<String, String>,
    /// 按方法全名附加的字段
    pub methods: BTreeMap<String, BTreeMap<String, String>>,
    /// 状态码名称到日志级别的覆盖，未列出的状态码使用默认映射
    pub levels: BTreeMap<String, Level>,
}

impl LoggerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 编译成拦截器选项
    ///
    /// 没有配置字段时不产生上下文种子，没有级别覆盖时不产生级别函数。
    pub fn into_options(self) -> Result<Vec<LogOption>> {
        let mut options = Vec::new();

        if !self.fields.is_empty() || !self.methods.is_empty() {
            let fields = self.fields;
            let methods = self.methods;
            options.push(with_logger_context(move |full_method| {
                let scoped = methods.get(full_method);
                if fields.is_empty() && scoped.is_none() {
                    return None;
                }
                let mut context: LogContext = fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                if let Some(scoped) = scoped {
                    for (key, value) in scoped {
                        context.add(key.clone(), value.clone());
                    }
                }
                Some(context)
            }));
        }

        if !self.levels.is_empty() {
            let mut overrides: HashMap<i32, Level> = HashMap::with_capacity(self.levels.len());
            for (name, level) in self.levels {
                let code = parse_code(&name).ok_or(ConfigError::UnknownCode(name))?;
                overrides.insert(code as i32, level);
            }
            options.push(with_levels(move |code: Code| {
                overrides
                    .get(&(code as i32))
                    .copied()
                    .unwrap_or_else(|| default_code_to_level(code))
            }));
        }

        tracing::debug!(count = options.len(), "grpc logger options compiled from config");
        Ok(options)
    }
}
