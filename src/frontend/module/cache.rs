//! 单元缓存
//!
//! 会话内 `(规范化地址, 种类)` 到单元的唯一映射：
//!
//! | 键 | 来源 | 去重 |
//! |----|------|------|
//! | `Address { address, kind }` | `load` / `import` / 依赖发现 | 是 |
//! | `Eval(n)` | `eval` / `eval_async` | 否，每次新建 |
//!
//! # 设计思路
//!
//! - 单元存放在按插入顺序增长的竞技场里，用 [`UnitId`] 索引
//! - 条目从不移除，因此单元之间的引用（包括环）不需要所有权
//! - 插入顺序即依赖发现顺序，执行顺序的遍历从这里出发

use std::fmt;
use std::ops::{Index, IndexMut};

use indexmap::IndexMap;

use super::unit::{Unit, UnitKind, UnitOrigin, UnitState};
use crate::frontend::toolchain::Language;

/// 单元标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(usize);

impl UnitId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitKey {
    /// 按地址获取的单元
    Address { address: String, kind: UnitKind },
    /// 内联求值单元，每次求值唯一
    Eval(u64),
}

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// 命中已有单元的次数
    pub hits: usize,
    /// 新建单元的次数
    pub misses: usize,
    /// 当前单元数
    pub entries: usize,
}

impl CacheStats {
    /// 命中率（百分比）
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// 单元缓存
#[derive(Debug)]
pub struct UnitCache<L: Language> {
    units: Vec<Unit<L>>,
    keys: IndexMap<UnitKey, UnitId>,
    next_eval: u64,
    hits: usize,
    misses: usize,
}

impl<L: Language> Default for UnitCache<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Language> UnitCache<L> {
    /// 创建空缓存
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            keys: IndexMap::new(),
            next_eval: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// 查找或创建按地址获取的单元
    ///
    /// 返回单元标识以及是否新建。地址应当已经规范化。
    pub fn get_or_insert(
        &mut self,
        address: &str,
        kind: UnitKind,
    ) -> (UnitId, bool) {
        let key = UnitKey::Address {
            address: address.to_string(),
            kind,
        };
        if let Some(&id) = self.keys.get(&key) {
            self.hits += 1;
            return (id, false);
        }

        self.misses += 1;
        let id = self.push(address.to_string(), kind, UnitOrigin::Load);
        self.keys.insert(key, id);
        tracing::trace!(unit = %address, %kind, %id, "cache insert");
        (id, true)
    }

    /// 只查不建
    pub fn lookup(
        &self,
        address: &str,
        kind: UnitKind,
    ) -> Option<UnitId> {
        self.keys
            .get(&UnitKey::Address {
                address: address.to_string(),
                kind,
            })
            .copied()
    }

    /// 新建内联求值单元，键不透明且唯一
    ///
    /// 单元地址为 `<base>#eval-<n>`，诊断可以区分不同的求值单元。
    pub fn insert_eval(
        &mut self,
        base_address: &str,
        kind: UnitKind,
    ) -> UnitId {
        let serial = self.next_eval;
        let key = UnitKey::Eval(serial);
        self.next_eval += 1;
        let address = format!("{}#eval-{}", base_address, serial);
        let id = self.push(address, kind, UnitOrigin::Eval);
        self.keys.insert(key, id);
        id
    }

    fn push(
        &mut self,
        address: String,
        kind: UnitKind,
        origin: UnitOrigin,
    ) -> UnitId {
        let id = UnitId::new(self.units.len());
        self.units.push(Unit::new(id, address, kind, origin));
        id
    }

    pub fn get(
        &self,
        id: UnitId,
    ) -> Option<&Unit<L>> {
        self.units.get(id.index())
    }

    pub fn get_mut(
        &mut self,
        id: UnitId,
    ) -> Option<&mut Unit<L>> {
        self.units.get_mut(id.index())
    }

    /// 所有单元标识，按插入顺序
    pub fn ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        (0..self.units.len()).map(UnitId::new)
    }

    /// 所有单元，按插入顺序
    pub fn iter(&self) -> impl Iterator<Item = &Unit<L>> + '_ {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 是否所有单元都满足谓词
    pub fn are_all(
        &self,
        predicate: impl Fn(UnitState) -> bool,
    ) -> bool {
        self.units.iter().all(|unit| predicate(unit.state()))
    }

    /// 是否存在满足谓词的单元
    pub fn any(
        &self,
        predicate: impl Fn(UnitState) -> bool,
    ) -> bool {
        self.units.iter().any(|unit| predicate(unit.state()))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.units.len(),
        }
    }
}

impl<L: Language> Index<UnitId> for UnitCache<L> {
    type Output = Unit<L>;

    fn index(
        &self,
        id: UnitId,
    ) -> &Unit<L> {
        &self.units[id.index()]
    }
}

impl<L: Language> IndexMut<UnitId> for UnitCache<L> {
    fn index_mut(
        &mut self,
        id: UnitId,
    ) -> &mut Unit<L> {
        &mut self.units[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::plain::Plain;

    #[test]
    fn test_same_address_and_kind_share_unit() {
        let mut cache: UnitCache<Plain> = UnitCache::new();
        let (a, created) = cache.get_or_insert("/a", UnitKind::Module);
        assert!(created);
        let (again, created) = cache.get_or_insert("/a", UnitKind::Module);
        assert!(!created);
        assert_eq!(a, again);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_kind_is_part_of_key() {
        let mut cache: UnitCache<Plain> = UnitCache::new();
        let (module, _) = cache.get_or_insert("/a", UnitKind::Module);
        let (script, _) = cache.get_or_insert("/a", UnitKind::Script);
        assert_ne!(module, script);
        assert_eq!(cache.lookup("/a", UnitKind::Script), Some(script));
        assert_eq!(cache.lookup("/b", UnitKind::Script), None);
    }

    #[test]
    fn test_eval_units_never_dedupe() {
        let mut cache: UnitCache<Plain> = UnitCache::new();
        let first = cache.insert_eval("/", UnitKind::Script);
        let second = cache.insert_eval("/", UnitKind::Script);
        assert_ne!(first, second);
        assert_eq!(cache[first].address(), "/#eval-0");
        assert_eq!(cache[second].address(), "/#eval-1");
        assert_eq!(cache[first].state(), UnitState::Loaded);
        assert_eq!(cache[first].origin(), UnitOrigin::Eval);
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut cache: UnitCache<Plain> = UnitCache::new();
        cache.get_or_insert("/c", UnitKind::Module);
        cache.get_or_insert("/a", UnitKind::Module);
        let addresses: Vec<_> = cache
            .ids()
            .map(|id| cache[id].address().to_string())
            .collect();
        assert_eq!(addresses, vec!["/c", "/a"]);
    }

    #[test]
    fn test_stats() {
        let mut cache: UnitCache<Plain> = UnitCache::new();
        cache.get_or_insert("/a", UnitKind::Module);
        cache.get_or_insert("/a", UnitKind::Module);
        cache.get_or_insert("/b", UnitKind::Module);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 2);
        assert!((stats.hit_rate() - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_are_all() {
        let mut cache: UnitCache<Plain> = UnitCache::new();
        assert!(cache.are_all(|s| s >= UnitState::Parsed));
        let (a, _) = cache.get_or_insert("/a", UnitKind::Module);
        assert!(!cache.are_all(|s| s >= UnitState::Parsed));
        cache[a].set_state(UnitState::Parsed).unwrap();
        assert!(cache.are_all(|s| s >= UnitState::Parsed));
        assert!(cache.any(|s| s == UnitState::Parsed));
    }
}
