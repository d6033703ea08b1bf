//! # Record views handed to modules.
//!
//! [`Record`] is what a module sees of one principal while it runs: typed
//! lookups plus buffered puts. [`Event`] adds the event's id, time and parents.
//!
//! ## Rules
//! - Every successful lookup records the product id; those ids become the
//!   [`Parentage`] of everything the module puts.
//! - Puts are buffered and only committed when the module returns `Ok`, so a
//!   failing module leaves no partial products behind.
//! - A put whose key is not registered, repeats an earlier put, or names a
//!   product already present fails the commit with `InsertFailure`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::module::ModuleDescription;
use crate::error::{Error, Result};
use crate::identity::{BranchKey, EventID, ProductID, Timestamp};
use crate::principal::{
    EventPrincipal, Handle, LumiPrincipal, OwnedProduct, Principal, RunPrincipal, Selector,
};
use crate::provenance::Parentage;

/// A module's view of one principal.
pub struct Record<'a> {
    principal: &'a Principal,
    module: &'a ModuleDescription,
    puts: Vec<(BranchKey, OwnedProduct)>,
    gotten: RefCell<Vec<ProductID>>,
}

impl<'a> Record<'a> {
    pub(crate) fn new(principal: &'a Principal, module: &'a ModuleDescription) -> Self {
        Self {
            principal,
            module,
            puts: Vec::new(),
            gotten: RefCell::new(Vec::new()),
        }
    }

    pub fn principal(&self) -> &'a Principal {
        self.principal
    }

    pub fn module(&self) -> &ModuleDescription {
        self.module
    }

    fn track<T>(&self, h: Result<Handle<T>>) -> Result<Handle<T>>
    where
        T: Send + Sync + 'static,
    {
        if let Ok(handle) = &h {
            self.gotten.borrow_mut().push(handle.id());
        }
        h
    }

    /// Exactly one `T` from module `label` (empty instance).
    pub fn get_by_label<T: Send + Sync + 'static>(&self, label: &str) -> Result<Handle<T>> {
        self.track(self.principal.get_by_label(label, ""))
    }

    /// Exactly one `T` from module `label`, instance `instance`.
    pub fn get_by_label_instance<T: Send + Sync + 'static>(&self, label: &str, instance: &str) -> Result<Handle<T>> {
        self.track(self.principal.get_by_label(label, instance))
    }

    /// Exactly one `T` matching `selector`.
    pub fn get_by_selector<T: Send + Sync + 'static>(&self, selector: &Selector) -> Result<Handle<T>> {
        self.track(self.principal.get_typed(selector))
    }

    /// Exactly one `T` in the record.
    pub fn get_by_type<T: Send + Sync + 'static>(&self) -> Result<Handle<T>> {
        self.track(self.principal.get_by_type())
    }

    /// Every `T` in the record.
    pub fn get_many_by_type<T: Send + Sync + 'static>(&self) -> Result<Vec<Handle<T>>> {
        let handles = self.principal.get_many_by_type::<T>()?;
        self.gotten.borrow_mut().extend(handles.iter().map(Handle::id));
        Ok(handles)
    }

    /// Product `id`, viewed as `T`.
    pub fn get<T: Send + Sync + 'static>(&self, id: ProductID) -> Result<Arc<T>> {
        let product = self.principal.get(id)?;
        let typed = product
            .downcast::<T>()
            .map_err(|_| Error::Logic(format!("product {id} cannot be viewed as {}", std::any::type_name::<T>())))?;
        self.gotten.borrow_mut().push(id);
        Ok(typed)
    }

    /// Buffers `value` under the empty instance label.
    pub fn put<T: Send + Sync + 'static>(&mut self, value: T) {
        self.put_instance(value, "");
    }

    /// Buffers `value` under `instance`.
    pub fn put_instance<T: Send + Sync + 'static>(&mut self, value: T, instance: &str) {
        let key = BranchKey::of::<T>(
            self.module.label.as_str(),
            instance,
            self.module.process_name.as_str(),
        );
        self.puts.push((key, Arc::new(value)));
    }

    /// Number of buffered puts.
    pub fn pending(&self) -> usize {
        self.puts.len()
    }

    /// Moves the buffered puts into the principal.
    ///
    /// Every key is checked before the first insertion, so a rejected commit
    /// inserts nothing.
    pub(crate) fn commit(self) -> Result<()> {
        let registry = self.principal.context().registry();
        let mut seen = HashSet::with_capacity(self.puts.len());
        for (key, _) in &self.puts {
            if registry.get(key).is_none() {
                return Err(Error::InsertFailure(format!(
                    "module '{}' put product {key} which it did not declare",
                    self.module.label
                )));
            }
            if !seen.insert(key) {
                return Err(Error::InsertFailure(format!(
                    "module '{}' put product {key} more than once",
                    self.module.label
                )));
            }
            self.principal.can_insert(key)?;
        }
        let parentage = Parentage::new(self.gotten.into_inner());
        for (key, product) in self.puts {
            self.principal.put(&key, product, parentage.clone())?;
        }
        Ok(())
    }
}

/// A module's view of one event.
pub struct Event<'a> {
    record: Record<'a>,
    event: &'a EventPrincipal,
}

impl<'a> Event<'a> {
    pub(crate) fn new(event: &'a EventPrincipal, module: &'a ModuleDescription) -> Self {
        Self {
            record: Record::new(event, module),
            event,
        }
    }

    pub fn id(&self) -> EventID {
        self.event.id()
    }

    pub fn time(&self) -> Timestamp {
        self.event.time()
    }

    pub fn lumi(&self) -> &Arc<LumiPrincipal> {
        self.event.lumi()
    }

    pub fn run(&self) -> &Arc<RunPrincipal> {
        self.event.run()
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.record.commit()
    }
}

impl<'a> Deref for Event<'a> {
    type Target = Record<'a>;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl DerefMut for Event<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.record
    }
}
