use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use virtualist::{
    DEFAULT_OVERHANG, Direction, Error, Extent, ExtentSource, HostError, ItemKey, KeyFn,
    LayoutOptions, ReconcilerOptions, SlotFactory,
};

pub type FactoryFn<S> = Box<dyn FnMut(usize) -> Result<S, HostError>>;
pub type UpdateFn<T, S> = Box<dyn FnMut(&mut S, &T, usize) -> Result<(), HostError>>;
pub type RecycleFn<S> = Box<dyn FnMut(&mut S, usize)>;
pub type RemoveFn<S> = Box<dyn FnMut(S)>;

/// Closure-based list configuration.
///
/// `factory_fn` and `update_fn` are required, but their absence is only reported when a render
/// first needs them.
pub struct ListConfig<T, S, K = ItemKey> {
    pub direction: Direction,
    pub overhang_px: f64,
    pub item_extent: ExtentSource,
    pub key_fn: KeyFn<T, K>,
    pub factory_fn: Option<FactoryFn<S>>,
    pub update_fn: Option<UpdateFn<T, S>>,
    pub recycle_fn: Option<RecycleFn<S>>,
    pub remove_fn: Option<RemoveFn<S>>,
    pub items: Vec<T>,
    pub recycling: bool,
}

impl<T: 'static, S> ListConfig<T, S, ItemKey> {
    /// A configuration keyed by item index.
    pub fn new(items: Vec<T>) -> Self {
        Self::with_key_fn(items, ReconcilerOptions::<T>::new().key_fn)
    }
}

impl<T: 'static, S, K: 'static> ListConfig<T, S, K> {
    /// A configuration keyed by a stable identity over the item.
    pub fn new_with_key(items: Vec<T>, key_fn: impl Fn(&T) -> K + Send + Sync + 'static) -> Self {
        Self::with_key_fn(items, Arc::new(move |item: &T, _: usize| key_fn(item)))
    }
}

impl<T, S, K> ListConfig<T, S, K> {
    fn with_key_fn(items: Vec<T>, key_fn: KeyFn<T, K>) -> Self {
        Self {
            direction: Direction::Vertical,
            overhang_px: DEFAULT_OVERHANG,
            item_extent: ExtentSource::default(),
            key_fn,
            factory_fn: None,
            update_fn: None,
            recycle_fn: None,
            remove_fn: None,
            items,
            recycling: false,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_overhang(mut self, overhang_px: f64) -> Self {
        self.overhang_px = overhang_px;
        self
    }

    pub fn with_fixed_extent(mut self, extent: f64) -> Self {
        self.item_extent = ExtentSource::Fixed(extent);
        self
    }

    pub fn with_estimator(mut self, f: impl Fn(usize) -> Extent + Send + Sync + 'static) -> Self {
        self.item_extent = ExtentSource::Estimator(Arc::new(f));
        self
    }

    pub fn with_factory(mut self, f: impl FnMut(usize) -> Result<S, HostError> + 'static) -> Self {
        self.factory_fn = Some(Box::new(f));
        self
    }

    pub fn with_update(
        mut self,
        f: impl FnMut(&mut S, &T, usize) -> Result<(), HostError> + 'static,
    ) -> Self {
        self.update_fn = Some(Box::new(f));
        self
    }

    pub fn with_recycle(mut self, f: impl FnMut(&mut S, usize) + 'static) -> Self {
        self.recycle_fn = Some(Box::new(f));
        self
    }

    pub fn with_remove(mut self, f: impl FnMut(S) + 'static) -> Self {
        self.remove_fn = Some(Box::new(f));
        self
    }

    pub fn with_recycling(mut self, recycling: bool) -> Self {
        self.recycling = recycling;
        self
    }

    /// Splits the configuration into the pieces the core types are built from.
    pub fn into_parts(
        self,
    ) -> (
        LayoutOptions,
        ReconcilerOptions<T, K>,
        CallbackFactory<T, S>,
        Vec<T>,
    ) {
        let layout = LayoutOptions {
            total_items: self.items.len(),
            direction: self.direction,
            overhang: self.overhang_px,
            item_extent: self.item_extent,
        };
        let reconciler = ReconcilerOptions {
            key_fn: self.key_fn,
            recycling: self.recycling,
        };
        let factory = CallbackFactory {
            factory_fn: self.factory_fn,
            update_fn: self.update_fn,
            recycle_fn: self.recycle_fn,
            remove_fn: self.remove_fn,
        };
        (layout, reconciler, factory, self.items)
    }
}

impl<T, S, K> core::fmt::Debug for ListConfig<T, S, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListConfig")
            .field("direction", &self.direction)
            .field("overhang_px", &self.overhang_px)
            .field("item_extent", &self.item_extent)
            .field("items", &self.items.len())
            .field("recycling", &self.recycling)
            .field("factory_fn", &self.factory_fn.is_some())
            .field("update_fn", &self.update_fn.is_some())
            .finish_non_exhaustive()
    }
}

/// A [`SlotFactory`] over the closures of a [`ListConfig`].
pub struct CallbackFactory<T, S> {
    factory_fn: Option<FactoryFn<S>>,
    update_fn: Option<UpdateFn<T, S>>,
    recycle_fn: Option<RecycleFn<S>>,
    remove_fn: Option<RemoveFn<S>>,
}

impl<T, S> SlotFactory<T> for CallbackFactory<T, S> {
    type Slot = S;

    fn create(&mut self, index: usize) -> Result<S, Error> {
        let f = self
            .factory_fn
            .as_mut()
            .ok_or(Error::MissingOption("factory_fn"))?;
        f(index).map_err(|source| Error::host("factory_fn", source))
    }

    fn update(&mut self, slot: &mut S, item: &T, index: usize) -> Result<(), Error> {
        let f = self
            .update_fn
            .as_mut()
            .ok_or(Error::MissingOption("update_fn"))?;
        f(slot, item, index).map_err(|source| Error::host("update_fn", source))
    }

    fn recycle(&mut self, slot: &mut S, index: usize) {
        if let Some(f) = self.recycle_fn.as_mut() {
            f(slot, index);
        }
    }

    fn remove(&mut self, slot: S) {
        match self.remove_fn.as_mut() {
            Some(f) => f(slot),
            None => drop(slot),
        }
    }
}

impl<T, S> core::fmt::Debug for CallbackFactory<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallbackFactory")
            .field("factory_fn", &self.factory_fn.is_some())
            .field("update_fn", &self.update_fn.is_some())
            .field("recycle_fn", &self.recycle_fn.is_some())
            .field("remove_fn", &self.remove_fn.is_some())
            .finish()
    }
}
