//! Shape dispatcher
//!
//! Indexes registered dispatch tables by mangled shape and resolves methods
//! to their trampolines. Table lookups happen once per method, at resolution
//! time; after that the interpreter calls the cached pointers directly.

use std::ffi::c_void;
use std::sync::Arc;

use callbridge_abi::{Classifier, MethodSignature, ShapeSignature, SlotKind};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{BridgeError, ShapeFamily};
use crate::frame::StackFrame;
use crate::runtime::{M2nFn, MethodHandle};
use crate::table::{verify_table, ShapeTables, TableEntry};

/// Type-erased N2M or adjustor-thunk entry point.
///
/// Cast to the shape's C signature before calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trampoline(*const ());

// Code pointers into static trampolines.
unsafe impl Send for Trampoline {}
unsafe impl Sync for Trampoline {}

impl Trampoline {
    pub fn as_ptr(self) -> *const () {
        self.0
    }
}

/// M2N entry point paired with its shape.
///
/// [`invoke`](Self::invoke) validates the call against the shape and frame
/// before entering the trampoline; the raw [`entry`](Self::entry) does not.
#[derive(Debug, Clone)]
pub struct M2nInvoker {
    shape: ShapeSignature,
    entry: M2nFn,
}

impl M2nInvoker {
    pub fn new(shape: ShapeSignature, entry: M2nFn) -> Self {
        Self { shape, entry }
    }

    pub fn shape(&self) -> &ShapeSignature {
        &self.shape
    }

    pub fn entry(&self) -> M2nFn {
        self.entry
    }

    /// Check that `arg_var_indexes` and `ret` fit the shape and every
    /// parameter's slots lie inside `frame`.
    pub fn check(
        &self,
        arg_var_indexes: &[u16],
        frame: &StackFrame<'_>,
        ret: *mut c_void,
    ) -> Result<(), BridgeError> {
        let params = self.shape.params();
        if arg_var_indexes.len() != params.len() {
            return Err(BridgeError::ArityMismatch {
                shape: self.shape.mangle(),
                expected: params.len(),
                actual: arg_var_indexes.len(),
            });
        }

        for (param, (&index, kind)) in arg_var_indexes.iter().zip(params).enumerate() {
            let index = index as usize;
            if !frame.fits(index, kind.size_bytes()) {
                return Err(BridgeError::FrameOverrun {
                    shape: self.shape.mangle(),
                    param,
                    index,
                    end: index + kind.slot_count().max(1),
                    len: frame.len(),
                });
            }
        }

        if ret.is_null() && self.shape.ret() != SlotKind::Void {
            return Err(BridgeError::MissingReturnBuffer {
                shape: self.shape.mangle(),
            });
        }
        Ok(())
    }

    /// Call the native implementation of `method` with arguments from `frame`.
    ///
    /// # Safety
    ///
    /// `method` must resolve to a native function of this shape, and `ret`
    /// must be valid for the shape's return carrier.
    pub unsafe fn invoke(
        &self,
        method: MethodHandle,
        arg_var_indexes: &[u16],
        frame: &mut StackFrame<'_>,
        ret: *mut c_void,
    ) -> Result<(), BridgeError> {
        self.check(arg_var_indexes, frame, ret)?;
        unsafe { (self.entry)(method, arg_var_indexes.as_ptr(), frame.as_mut_ptr(), ret) };
        Ok(())
    }
}

/// Trampolines for one resolved method.
#[derive(Debug, Clone)]
pub struct ResolvedBridge {
    m2n: M2nInvoker,
    n2m: Trampoline,
    adjustor_thunk: Option<Trampoline>,
}

impl ResolvedBridge {
    pub fn shape(&self) -> &ShapeSignature {
        self.m2n.shape()
    }

    pub fn m2n(&self) -> &M2nInvoker {
        &self.m2n
    }

    pub fn n2m(&self) -> Trampoline {
        self.n2m
    }

    /// Present when the first parameter can carry a receiver.
    pub fn adjustor_thunk(&self) -> Option<Trampoline> {
        self.adjustor_thunk
    }
}

/// Registry of shape tables and per-method resolution cache.
///
/// Safe to share between threads; the cache is the only mutable state.
pub struct Dispatcher {
    classifier: Classifier,
    m2n: FxHashMap<&'static str, M2nFn>,
    n2m: FxHashMap<&'static str, Trampoline>,
    adjustor_thunk: FxHashMap<&'static str, Trampoline>,
    resolved: RwLock<FxHashMap<MethodHandle, Arc<ResolvedBridge>>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("target", &self.classifier.target())
            .field("m2n", &self.m2n.len())
            .field("n2m", &self.n2m.len())
            .field("adjustor_thunk", &self.adjustor_thunk.len())
            .field("resolved", &self.resolved.read().len())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with no tables.
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            m2n: FxHashMap::default(),
            n2m: FxHashMap::default(),
            adjustor_thunk: FxHashMap::default(),
            resolved: RwLock::new(FxHashMap::default()),
        }
    }

    /// Create a dispatcher over a single table set.
    pub fn with_tables<T: ShapeTables>(classifier: Classifier) -> Result<Self, BridgeError> {
        let mut dispatcher = Self::new(classifier);
        dispatcher.register::<T>()?;
        Ok(dispatcher)
    }

    /// Add a table set.
    ///
    /// All three tables are verified before any entry is indexed. A shape
    /// already registered by an earlier set keeps its earlier trampoline.
    pub fn register<T: ShapeTables>(&mut self) -> Result<(), BridgeError> {
        let table = |family, source| BridgeError::Table { family, source };
        verify_table(T::M2N).map_err(|e| table(ShapeFamily::M2n, e))?;
        verify_table(T::N2M).map_err(|e| table(ShapeFamily::N2m, e))?;
        verify_table(T::ADJUSTOR_THUNK).map_err(|e| table(ShapeFamily::AdjustorThunk, e))?;

        index(&mut self.m2n, T::M2N, |f| f);
        index(&mut self.n2m, T::N2M, Trampoline);
        index(&mut self.adjustor_thunk, T::ADJUSTOR_THUNK, Trampoline);

        tracing::debug!(
            target_abi = %self.classifier.target(),
            m2n = self.m2n.len(),
            n2m = self.n2m.len(),
            adjustor_thunk = self.adjustor_thunk.len(),
            "registered shape tables"
        );
        Ok(())
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Number of distinct shapes registered
    pub fn len(&self) -> usize {
        self.m2n.len()
    }

    pub fn is_empty(&self) -> bool {
        self.m2n.is_empty()
    }

    pub fn contains(&self, shape: &ShapeSignature) -> bool {
        self.m2n.contains_key(shape.mangle().as_str())
    }

    /// M2N trampoline for `shape`.
    pub fn m2n(&self, shape: &ShapeSignature) -> Result<M2nInvoker, BridgeError> {
        let entry = lookup(&self.m2n, ShapeFamily::M2n, shape)?;
        Ok(M2nInvoker::new(shape.clone(), entry))
    }

    /// N2M trampoline for `shape`.
    pub fn n2m(&self, shape: &ShapeSignature) -> Result<Trampoline, BridgeError> {
        lookup(&self.n2m, ShapeFamily::N2m, shape)
    }

    /// Adjustor thunk for `shape`.
    pub fn adjustor_thunk(&self, shape: &ShapeSignature) -> Result<Trampoline, BridgeError> {
        lookup(&self.adjustor_thunk, ShapeFamily::AdjustorThunk, shape)
    }

    /// Trampolines for an already classified shape.
    pub fn bridge_for(&self, shape: &ShapeSignature) -> Result<ResolvedBridge, BridgeError> {
        let adjustor_thunk = if shape.has_receiver_slot() {
            Some(self.adjustor_thunk(shape)?)
        } else {
            None
        };
        Ok(ResolvedBridge {
            m2n: self.m2n(shape)?,
            n2m: self.n2m(shape)?,
            adjustor_thunk,
        })
    }

    /// Classify `signature` and look up its trampolines, memoized per method.
    ///
    /// A handle names one method and therefore one signature for the life of
    /// the dispatcher. Once a handle is cached, later calls return its bridge
    /// without reading `signature` again; runtimes that reuse handles for
    /// other methods need a fresh dispatcher.
    pub fn resolve(
        &self,
        method: MethodHandle,
        signature: &MethodSignature,
    ) -> Result<Arc<ResolvedBridge>, BridgeError> {
        if let Some(bridge) = self.resolved.read().get(&method) {
            return Ok(Arc::clone(bridge));
        }

        let shape = self.classifier.classify_signature(signature)?;
        let bridge = Arc::new(self.bridge_for(&shape)?);

        // Another thread may have resolved the same method meanwhile; keep
        // whichever landed first so every caller sees one bridge.
        let mut resolved = self.resolved.write();
        let bridge = Arc::clone(resolved.entry(method).or_insert(bridge));
        tracing::debug!(?method, shape = %bridge.shape(), "resolved bridge");
        Ok(bridge)
    }

    /// Number of methods resolved so far
    pub fn resolved_count(&self) -> usize {
        self.resolved.read().len()
    }
}

fn index<F, V>(
    map: &mut FxHashMap<&'static str, V>,
    table: &'static [TableEntry<F>],
    wrap: impl Fn(F) -> V,
) where
    F: Copy + 'static,
{
    for entry in table {
        if let (Some(key), Some(pointer)) = (entry.signature(), entry.method_pointer()) {
            map.entry(key).or_insert_with(|| wrap(pointer));
        }
    }
}

fn lookup<V: Copy>(
    map: &FxHashMap<&'static str, V>,
    family: ShapeFamily,
    shape: &ShapeSignature,
) -> Result<V, BridgeError> {
    let name = shape.mangle();
    match map.get(name.as_str()) {
        Some(value) => Ok(*value),
        None => {
            tracing::error!(%family, shape = %name, "no trampoline generated for shape");
            Err(BridgeError::MissingShape {
                family,
                shape: name,
            })
        }
    }
}
