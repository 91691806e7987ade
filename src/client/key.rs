use tracing::debug;

use super::{Item, Registry};
use crate::error::RegResult;
use crate::options::{Arg, Options};
use crate::path::{self, Hive};

/// A [`Registry`] bound to one base key.
///
/// A leading path argument is resolved against the base key:
///
/// - `\Child` and `.\Child` address a subkey of the base key
/// - any other text is a value name on the base key
/// - no path at all addresses the base key itself
///
/// ```no_run
/// use regkit::args;
/// use regkit::client::RegistryKey;
///
/// # async fn demo() -> regkit::error::RegResult<()> {
/// let vendor = RegistryKey::new("HKCU\\Software\\Vendor", None)?;
/// vendor.set(args!["Version", 3u32]).await?;
/// vendor.set(args!["\\Plugins"]).await?;
/// assert!(vendor.has(args![".\\Plugins"]).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RegistryKey {
    path: String,
    hive: Hive,
    registry: Registry,
}

impl RegistryKey {
    /// Bind to `key_path` using the process-wide executor.
    pub fn new(key_path: &str, options: Option<Options>) -> RegResult<Self> {
        Self::bind(&Registry::new(), key_path, options)
    }

    pub(crate) fn bind(
        registry: &Registry,
        key_path: &str,
        options: Option<Options>,
    ) -> RegResult<Self> {
        let (hive, canonical) = path::resolve_key_path(key_path)?;
        debug!(path = %canonical, hive = hive.short(), "bound registry key");
        Ok(Self {
            path: canonical,
            hive,
            registry: registry.with_call_options(options),
        })
    }

    /// Canonical base path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Short spelling of the root, e.g. `HKCU`.
    pub fn hive(&self) -> &'static str {
        self.hive.short()
    }

    /// Long spelling of the root, e.g. `HKEY_CURRENT_USER`.
    pub fn hive_long(&self) -> &'static str {
        self.hive.long()
    }

    /// The underlying handle, carrying this key's options.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve the arguments of a call against the base key.
    pub fn resolve(&self, mut args: Vec<Arg>) -> Vec<Arg> {
        let subkey = match args.first() {
            Some(Arg::Text(text)) => {
                let text = text.trim().replace('/', "\\");
                if let Some(rest) = text.strip_prefix(".\\") {
                    Some(format!("{}\\{}", self.path, rest))
                } else if text.starts_with('\\') {
                    Some(format!("{}{}", self.path, text))
                } else {
                    None
                }
            }
            _ => None,
        };
        match subkey {
            Some(full) => args[0] = Arg::Text(full),
            None => args.insert(0, Arg::Text(self.path.clone())),
        }
        args
    }

    /// See [`Registry::get`].
    pub async fn get(&self, args: Vec<Arg>) -> RegResult<Option<Item>> {
        self.registry.get(self.resolve(args)).await
    }

    /// See [`Registry::has`].
    pub async fn has(&self, args: Vec<Arg>) -> RegResult<bool> {
        self.registry.has(self.resolve(args)).await
    }

    /// See [`Registry::set`].
    pub async fn set(&self, args: Vec<Arg>) -> RegResult<()> {
        self.registry.set(self.resolve(args)).await
    }

    /// See [`Registry::delete`].
    pub async fn delete(&self, args: Vec<Arg>) -> RegResult<()> {
        self.registry.delete(self.resolve(args)).await
    }

    /// See [`Registry::clear`].
    pub async fn clear(&self, args: Vec<Arg>) -> RegResult<()> {
        self.registry.clear(self.resolve(args)).await
    }
}
