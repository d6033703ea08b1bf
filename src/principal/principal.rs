//! # Principal: the indexed product container of one record.
//!
//! ## Resolution protocol
//! ```text
//! get(id) / get_by_*(...) ─► find group(s) ─► resolve(group)
//!                                              │
//!   product present? ─── yes ─────────────────►│ return it (no side effect)
//!   on demand + handler? ─ yes ─► handler.try_to_fill(label) ─► slot or ProductNotFound
//!   otherwise ───────────────────► reader.fetch(key) ─► fill slot
//!   still empty ─────────────────► ProductNotFound
//! ```
//!
//! ## Rules
//! - The index lock is only held for lookups and insertion, never while a
//!   product is being resolved; resolution may re-enter `put`.
//! - Inserting into an empty slot fills it; inserting into a filled slot is an
//!   `InsertFailure`.
//! - Cardinality-checked lookups (`get_by_selector`, `get_by_label`,
//!   `get_by_type`) consider every process of the history. Use
//!   `get_latest_by_selector` to stop at the most recent process with a match.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::context::PrincipalContext;
use super::group::Group;
use super::handle::Handle;
use super::reader::{OwnedProduct, UnscheduledHandler};
use super::selector::Selector;
use crate::error::{Error, Result};
use crate::identity::{
    BranchKey, BranchType, ProcessConfiguration, ProcessHistory, ProductID, friendly_name_of,
};
use crate::provenance::{Parentage, Provenance};

#[derive(Default)]
struct GroupIndex {
    slots: Vec<Arc<Group>>,
    by_key: HashMap<BranchKey, usize>,
    by_id: HashMap<ProductID, usize>,
    by_type: HashMap<String, Vec<usize>>,
}

impl GroupIndex {
    fn insert(&mut self, group: Group) -> Result<()> {
        if let Some(&slot) = self.by_key.get(group.key()) {
            let existing = Arc::clone(&self.slots[slot]);
            return existing.absorb(group);
        }
        let slot = self.slots.len();
        self.by_key.insert(group.key().clone(), slot);
        self.by_id.insert(group.product_id(), slot);
        self.by_type
            .entry(group.key().friendly_type.clone())
            .or_default()
            .push(slot);
        self.slots.push(Arc::new(group));
        Ok(())
    }
}

/// Indexed collection of groups for one record.
pub struct Principal {
    branch_type: BranchType,
    ctx: PrincipalContext,
    history: ProcessHistory,
    index: Mutex<GroupIndex>,
    unscheduled: RwLock<Option<Arc<dyn UnscheduledHandler>>>,
}

impl Principal {
    /// Creates a principal for a record that went through `input_history`.
    ///
    /// The current process is appended to the history (a duplicate name is a
    /// configuration error), the history is registered, and an empty slot is
    /// added for every on-demand product of this record kind.
    pub fn new(branch_type: BranchType, ctx: PrincipalContext, input_history: ProcessHistory) -> Result<Self> {
        let mut history = input_history;
        history.push(ctx.process().clone())?;
        ctx.registries().register_history(&history);

        let principal = Self {
            branch_type,
            ctx,
            history,
            index: Mutex::new(GroupIndex::default()),
            unscheduled: RwLock::new(None),
        };
        let placeholders: Vec<_> = principal
            .ctx
            .registry()
            .products_of(branch_type)
            .filter(|d| d.on_demand)
            .cloned()
            .collect();
        for desc in placeholders {
            principal.add_group(Group::placeholder(desc))?;
        }
        Ok(principal)
    }

    pub fn branch_type(&self) -> BranchType {
        self.branch_type
    }

    pub fn process_history(&self) -> &ProcessHistory {
        &self.history
    }

    pub fn process_configuration(&self) -> &ProcessConfiguration {
        self.ctx.process()
    }

    pub fn context(&self) -> &PrincipalContext {
        &self.ctx
    }

    pub fn len(&self) -> usize {
        self.index.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn set_unscheduled_handler(&self, handler: Option<Arc<dyn UnscheduledHandler>>) {
        *self.unscheduled.write() = handler;
    }

    /// Inserts a group (see the module docs for the insertion rule).
    pub fn add_group(&self, group: Group) -> Result<()> {
        self.index.lock().insert(group)
    }

    /// Registers a product-less slot for a stream available from the delayed reader.
    pub fn add_delayed(&self, key: &BranchKey) -> Result<()> {
        let desc = self.registered(key)?;
        self.add_group(Group::placeholder(desc))
    }

    /// Inserts a produced product under its registered key.
    pub fn put(&self, key: &BranchKey, product: OwnedProduct, parentage: Parentage) -> Result<()> {
        let desc = self.registered(key)?;
        self.ctx.registries().register_parentage(&parentage);
        self.add_group(Group::with_product(desc, product, parentage))
    }

    /// Checks that `put` would accept a product under `key` without inserting one.
    pub fn can_insert(&self, key: &BranchKey) -> Result<()> {
        self.registered(key)?;
        match self.group_by_key(key) {
            Some(group) if group.is_materialized() => {
                Err(Error::InsertFailure(format!("product {key} is already present")))
            }
            _ => Ok(()),
        }
    }

    fn registered(&self, key: &BranchKey) -> Result<crate::identity::BranchDescription> {
        match self.ctx.registry().get(key) {
            Some(d) if d.branch_type == self.branch_type => Ok(d.clone()),
            Some(_) => Err(Error::InsertFailure(format!(
                "product {key} is not registered for {} records",
                self.branch_type.as_str()
            ))),
            None => Err(Error::InsertFailure(format!("product {key} is not registered"))),
        }
    }

    fn group_by_id(&self, id: ProductID) -> Option<Arc<Group>> {
        let index = self.index.lock();
        index.by_id.get(&id).map(|&slot| Arc::clone(&index.slots[slot]))
    }

    fn group_by_key(&self, key: &BranchKey) -> Option<Arc<Group>> {
        let index = self.index.lock();
        index.by_key.get(key).map(|&slot| Arc::clone(&index.slots[slot]))
    }

    /// Groups matching `selector` (and `type_name` if given), most recent process first.
    fn find_groups(&self, type_name: Option<&str>, selector: &Selector) -> Vec<Arc<Group>> {
        let mut found: Vec<Arc<Group>> = {
            let index = self.index.lock();
            let matches = |g: &Arc<Group>| selector.matches(g.key());
            match type_name {
                Some(t) => index
                    .by_type
                    .get(t)
                    .map(|slots| slots.iter().map(|&s| Arc::clone(&index.slots[s])).filter(matches).collect())
                    .unwrap_or_default(),
                None => index.slots.iter().filter(|g| matches(g)).cloned().collect(),
            }
        };
        found.sort_by_key(|g| {
            std::cmp::Reverse(
                self.history
                    .position(&g.key().process_name)
                    .map_or(0, |p| p + 1),
            )
        });
        found
    }

    fn exactly_one(&self, mut found: Vec<Arc<Group>>, criteria: impl FnOnce() -> String) -> Result<Arc<Group>> {
        match found.len() {
            0 => Err(Error::ProductNotFound(format!("no product matches {}", criteria()))),
            1 => Ok(found.remove(0)),
            count => Err(Error::TooManyMatches {
                criteria: criteria(),
                count,
            }),
        }
    }

    /// Materializes the product of `group`.
    pub fn resolve(&self, group: &Group) -> Result<OwnedProduct> {
        if let Some(p) = group.product() {
            return Ok(p);
        }
        if group.on_demand() {
            let handler = self.unscheduled.read().clone();
            if let Some(handler) = handler {
                if handler.try_to_fill(group.key().module_label.as_str(), self)? {
                    // The producer ran; never fall back to the reader.
                    return group.product().ok_or_else(|| {
                        Error::ProductNotFound(format!("on-demand module did not produce {}", group.key()))
                    });
                }
            }
        }
        let product = self.ctx.reader().fetch(group.key(), self)?;
        if let Err(e) = group.fill(Arc::clone(&product), Parentage::default()) {
            // Filled while the reader was running; keep the first product.
            return group.product().ok_or(e);
        }
        Ok(product)
    }

    /// Product with id `id`.
    pub fn get(&self, id: ProductID) -> Result<OwnedProduct> {
        let group = self
            .group_by_id(id)
            .ok_or_else(|| Error::ProductNotFound(format!("no product with id {id}")))?;
        self.resolve(&group)
    }

    /// Product stored under exactly `key`.
    pub fn get_by_key(&self, key: &BranchKey) -> Result<OwnedProduct> {
        let group = self
            .group_by_key(key)
            .ok_or_else(|| Error::ProductNotFound(format!("no product {key}")))?;
        self.resolve(&group)
    }

    /// Exactly one product (any type) matching `selector`, across the whole history.
    pub fn get_by_selector(&self, selector: &Selector) -> Result<(OwnedProduct, Provenance)> {
        let group = self.exactly_one(self.find_groups(None, selector), || selector.to_string())?;
        let product = self.resolve(&group)?;
        Ok((product, group.provenance()))
    }

    /// Most recent process with at least one match must have exactly one.
    pub fn get_latest_by_selector(&self, selector: &Selector) -> Result<(OwnedProduct, Provenance)> {
        let found = self.find_groups(None, selector);
        let newest: Vec<_> = match found.first() {
            Some(first) => {
                let process = first.key().process_name.clone();
                found.into_iter().filter(|g| g.key().process_name == process).collect()
            }
            None => found,
        };
        let group = self.exactly_one(newest, || selector.to_string())?;
        let product = self.resolve(&group)?;
        Ok((product, group.provenance()))
    }

    /// Every product matching `selector` (no cardinality check), most recent process first.
    pub fn get_many(&self, selector: &Selector) -> Result<Vec<(OwnedProduct, Provenance)>> {
        self.find_groups(None, selector)
            .into_iter()
            .map(|g| Ok((self.resolve(&g)?, g.provenance())))
            .collect()
    }

    /// Exactly one `T` matching `selector`.
    pub fn get_typed<T: Send + Sync + 'static>(&self, selector: &Selector) -> Result<Handle<T>> {
        let type_name = friendly_name_of::<T>();
        let found = self.find_groups(Some(&type_name), selector);
        let group = self.exactly_one(found, || format!("type={type_name} {selector}"))?;
        Handle::from_group(self, &group)
    }

    /// Exactly one `T` with this module label and instance.
    pub fn get_by_label<T: Send + Sync + 'static>(&self, label: &str, instance: &str) -> Result<Handle<T>> {
        self.get_typed(&Selector::by_label(label, instance, None))
    }

    /// Exactly one `T` in the record.
    pub fn get_by_type<T: Send + Sync + 'static>(&self) -> Result<Handle<T>> {
        self.get_typed(&Selector::Any)
    }

    /// Every `T` in the record.
    pub fn get_many_by_type<T: Send + Sync + 'static>(&self) -> Result<Vec<Handle<T>>> {
        let type_name = friendly_name_of::<T>();
        self.find_groups(Some(&type_name), &Selector::Any)
            .iter()
            .map(|g| Handle::from_group(self, g))
            .collect()
    }

    /// Provenance of product `id`, without materializing it.
    pub fn get_provenance(&self, id: ProductID) -> Result<Provenance> {
        self.group_by_id(id)
            .map(|g| g.provenance())
            .ok_or_else(|| Error::ProductNotFound(format!("no provenance for product id {id}")))
    }

    /// Resolves every slot that is not produced on demand.
    pub fn read_immediate(&self) -> Result<()> {
        let groups: Vec<_> = self.index.lock().slots.clone();
        for g in groups.iter().filter(|g| !g.on_demand()) {
            self.resolve(g)?;
        }
        Ok(())
    }

    /// Ids of every slot, in insertion order.
    pub fn product_ids(&self) -> Vec<ProductID> {
        self.index.lock().slots.iter().map(|g| g.product_id()).collect()
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("branch_type", &self.branch_type)
            .field("process", &self.ctx.process().process_name)
            .field("groups", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::principal::DelayedReader;
    use crate::provenance::{JobRegistries, ProductRegistry};
    use crate::testing::process_config;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReader {
        calls: AtomicUsize,
    }

    impl DelayedReader for CountingReader {
        fn fetch(&self, key: &BranchKey, _p: &Principal) -> Result<OwnedProduct, ReadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if key.module_label == "stored" {
                Ok(Arc::new(42i32))
            } else {
                Err(ReadError::Missing { branch: key.to_string() })
            }
        }
    }

    fn context(keys: &[BranchKey], reader: Arc<dyn DelayedReader>) -> PrincipalContext {
        let mut reg = ProductRegistry::new();
        for k in keys {
            reg.add_product(BranchType::Event, k.clone(), "T", Default::default()).unwrap();
        }
        reg.freeze();
        PrincipalContext::new(
            Arc::new(reg),
            Arc::new(process_config("P2")),
            Arc::new(JobRegistries::new()),
            reader,
        )
    }

    fn history_with(name: &str) -> ProcessHistory {
        let mut h = ProcessHistory::new();
        h.push(process_config(name)).unwrap();
        h
    }

    #[test]
    fn test_put_then_get_by_label() {
        let key = BranchKey::of::<i32>("modA", "", "P2");
        let p = Principal::new(BranchType::Event, context(&[key.clone()], Arc::new(crate::NoDelayedReader)), ProcessHistory::new()).unwrap();
        p.put(&key, Arc::new(7i32), Parentage::default()).unwrap();
        let h = p.get_by_label::<i32>("modA", "").unwrap();
        assert_eq!(*h, 7);
        assert!(h.provenance().is_present());
    }

    #[test]
    fn test_duplicate_put_rejected() {
        let key = BranchKey::of::<i32>("modA", "", "P2");
        let p = Principal::new(BranchType::Event, context(&[key.clone()], Arc::new(crate::NoDelayedReader)), ProcessHistory::new()).unwrap();
        p.put(&key, Arc::new(7i32), Parentage::default()).unwrap();
        let err = p.put(&key, Arc::new(8i32), Parentage::default()).unwrap_err();
        assert_eq!(err.category(), crate::Category::InsertFailure);
        assert_eq!(*p.get_by_label::<i32>("modA", "").unwrap(), 7);
    }

    #[test]
    fn test_unregistered_put_rejected() {
        let p = Principal::new(BranchType::Event, context(&[], Arc::new(crate::NoDelayedReader)), ProcessHistory::new()).unwrap();
        let err = p
            .put(&BranchKey::of::<i32>("x", "", "P2"), Arc::new(1i32), Parentage::default())
            .unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_delayed_reader_called_once() {
        let key = BranchKey::of::<i32>("stored", "", "P2");
        let reader = Arc::new(CountingReader { calls: AtomicUsize::new(0) });
        let p = Principal::new(BranchType::Event, context(&[key.clone()], reader.clone()), ProcessHistory::new()).unwrap();
        p.add_delayed(&key).unwrap();
        let id = p.product_ids()[0];
        let first = p.get(id).unwrap();
        let second = p.get(id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reader_miss_is_product_not_found() {
        let key = BranchKey::of::<i32>("gone", "", "P2");
        let reader = Arc::new(CountingReader { calls: AtomicUsize::new(0) });
        let p = Principal::new(BranchType::Event, context(&[key.clone()], reader), ProcessHistory::new()).unwrap();
        p.add_delayed(&key).unwrap();
        let err = p.get_by_label::<i32>("gone", "").unwrap_err();
        assert_eq!(err.category(), crate::Category::ProductNotFound);
    }

    struct IdleHandler;

    impl UnscheduledHandler for IdleHandler {
        fn try_to_fill(&self, _label: &str, _p: &Principal) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_on_demand_miss_does_not_reach_reader() {
        let key = BranchKey::of::<i32>("stored", "", "P2");
        let mut reg = ProductRegistry::new();
        reg.add_product(BranchType::Event, key.clone(), "T", Default::default()).unwrap();
        reg.set_on_demand("stored").unwrap();
        reg.freeze();
        let reader = Arc::new(CountingReader { calls: AtomicUsize::new(0) });
        let ctx = PrincipalContext::new(
            Arc::new(reg),
            Arc::new(process_config("P2")),
            Arc::new(JobRegistries::new()),
            reader.clone(),
        );
        let p = Principal::new(BranchType::Event, ctx, ProcessHistory::new()).unwrap();
        p.set_unscheduled_handler(Some(Arc::new(IdleHandler)));

        let err = p.get_by_label::<i32>("stored", "").unwrap_err();
        assert_eq!(err.category(), crate::Category::ProductNotFound);
        assert_eq!(reader.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_can_insert_rejects_filled_and_unknown_slots() {
        let key = BranchKey::of::<i32>("modA", "", "P2");
        let p = Principal::new(BranchType::Event, context(&[key.clone()], Arc::new(crate::NoDelayedReader)), ProcessHistory::new()).unwrap();
        assert!(p.can_insert(&key).is_ok());
        p.put(&key, Arc::new(7i32), Parentage::default()).unwrap();
        assert_eq!(p.can_insert(&key).unwrap_err().category(), crate::Category::InsertFailure);
        assert!(p.can_insert(&BranchKey::of::<u8>("modA", "", "P2")).is_err());
    }

    #[test]
    fn test_ambiguous_label_across_processes() {
        let old = BranchKey::of::<i32>("modA", "", "P1");
        let new = BranchKey::of::<i32>("modA", "", "P2");
        let p = Principal::new(
            BranchType::Event,
            context(&[old.clone(), new.clone()], Arc::new(crate::NoDelayedReader)),
            history_with("P1"),
        )
        .unwrap();
        p.put(&old, Arc::new(1i32), Parentage::default()).unwrap();
        p.put(&new, Arc::new(2i32), Parentage::default()).unwrap();

        let err = p.get_by_label::<i32>("modA", "").unwrap_err();
        assert!(matches!(err, Error::TooManyMatches { count: 2, .. }));

        let sel = Selector::by_label("modA", "", Some("P1"));
        assert_eq!(*p.get_typed::<i32>(&sel).unwrap(), 1);
        let sel = Selector::by_label("modA", "", Some("P2"));
        assert_eq!(*p.get_typed::<i32>(&sel).unwrap(), 2);

        let (latest, prov) = p.get_latest_by_selector(&Selector::module_label("modA")).unwrap();
        assert_eq!(*latest.downcast::<i32>().unwrap(), 2);
        assert_eq!(prov.key.process_name, "P2");
        assert_eq!(p.get_many_by_type::<i32>().unwrap().len(), 2);
    }

    #[test]
    fn test_current_process_cannot_repeat() {
        let err = Principal::new(BranchType::Event, context(&[], Arc::new(crate::NoDelayedReader)), history_with("P2")).unwrap_err();
        assert!(matches!(err, Error::DuplicateProcess(_)));
    }

    #[test]
    fn test_zero_matches_and_missing_id() {
        let p = Principal::new(BranchType::Event, context(&[], Arc::new(crate::NoDelayedReader)), ProcessHistory::new()).unwrap();
        assert_eq!(p.get_by_type::<u8>().unwrap_err().category(), crate::Category::ProductNotFound);
        assert!(p.get(ProductID::new(99)).is_err());
        assert!(p.get_provenance(ProductID::new(99)).is_err());
    }
}
