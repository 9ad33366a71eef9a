//! 地址解析器
//!
//! 将导入说明符（如 `"./util"`、`"../lib/math"`、`"/std/io"`）相对于引用方地址
//! 解析为规范化的绝对地址，作为单元缓存的键。
//!
//! # 解析规则
//!
//! 1. 带协议（`scheme://host/...`）或以 `/` 开头的说明符本身就是绝对地址
//! 2. 其余说明符拼接在引用方地址的目录之后
//! 3. 规范化：去掉 `.` 与空段，`..` 回退一段，根目录之上的 `..` 丢弃
//!
//! 相对地址（没有根）保留开头多出来的 `..`。

/// 地址解析
///
/// 同一对输入必须总是得到相同的结果。
pub trait AddressResolver {
    /// 相对于 `base` 解析 `specifier`
    fn resolve(
        &self,
        specifier: &str,
        base: &str,
    ) -> String;
}

impl<F> AddressResolver for F
where
    F: Fn(&str, &str) -> String,
{
    fn resolve(
        &self,
        specifier: &str,
        base: &str,
    ) -> String {
        self(specifier, base)
    }
}

/// 类 URL 路径解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver;

impl PathResolver {
    pub fn new() -> Self {
        Self
    }

    /// 规范化一个地址
    pub fn normalize(address: &str) -> String {
        let (prefix, path) = split_origin(address);
        let rooted = !prefix.is_empty() || path.starts_with('/');

        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(&last) if last != ".." => {
                        segments.pop();
                    }
                    _ if !rooted => segments.push(".."),
                    _ => {}
                },
                other => segments.push(other),
            }
        }

        let mut out = String::with_capacity(address.len());
        out.push_str(prefix);
        if rooted {
            out.push('/');
        }
        out.push_str(&segments.join("/"));
        if out.is_empty() {
            out.push('.');
        }
        out
    }

    /// 地址是否已是绝对地址
    pub fn is_absolute(specifier: &str) -> bool {
        specifier.starts_with('/') || has_scheme(specifier)
    }
}

impl AddressResolver for PathResolver {
    fn resolve(
        &self,
        specifier: &str,
        base: &str,
    ) -> String {
        if Self::is_absolute(specifier) {
            return Self::normalize(specifier);
        }
        let mut joined = String::from(directory_of(base));
        if !joined.is_empty() && !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(specifier);
        Self::normalize(&joined)
    }
}

/// `scheme://` 形式的协议前缀
fn has_scheme(address: &str) -> bool {
    match address.find("://") {
        Some(pos) if pos > 0 => address[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// 拆出 `scheme://authority` 前缀，返回 (前缀, 路径)
fn split_origin(address: &str) -> (&str, &str) {
    if !has_scheme(address) {
        return ("", address);
    }
    let after = address.find("://").map(|pos| pos + 3).unwrap_or(0);
    match address[after..].find('/') {
        Some(slash) => address.split_at(after + slash),
        None => (address, ""),
    }
}

/// 地址所在目录，包含末尾的 `/`
fn directory_of(base: &str) -> &str {
    let (prefix, path) = split_origin(base);
    match path.rfind('/') {
        Some(pos) => &base[..prefix.len() + pos + 1],
        None if !prefix.is_empty() => prefix,
        None => "",
    }
}
