//! Per-thread engine context.
//!
//! Views are single-threaded (`Rc` everywhere), so the shared pieces every
//! view needs live in a thread-local: the active configuration and the two
//! bootstrap meta views. Both metas are built directly rather than through
//! `View::new`, since `View::new` itself consults the meta-meta.

use std::cell::RefCell;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::column::Column;
use crate::config::EngineConfig;
use crate::item::ItemType;
use crate::view::{View, ViewData};

const META_TYPES: [ItemType; 3] = [ItemType::Str, ItemType::Str, ItemType::View];

pub struct Context {
    config: RefCell<EngineConfig>,
    meta_meta: OnceCell<View>,
    empty_meta: OnceCell<View>,
}

thread_local! {
    static CONTEXT: Context = Context {
        config: RefCell::new(EngineConfig::from_env()),
        meta_meta: OnceCell::new(),
        empty_meta: OnceCell::new(),
    };
}

impl Context {
    pub fn with<R>(f: impl FnOnce(&Context) -> R) -> R {
        CONTEXT.with(f)
    }

    pub fn config(&self) -> EngineConfig {
        self.config.borrow().clone()
    }

    pub fn set_config(&self, cfg: EngineConfig) {
        *self.config.borrow_mut() = cfg;
    }

    /// The meta view with no rows: describes views without columns.
    pub fn empty_meta(&self) -> View {
        self.empty_meta
            .get_or_init(|| {
                let cols = META_TYPES.iter().map(|ty| Column::empty(*ty)).collect();
                View::from_data(ViewData::new(None, META_TYPES.to_vec(), cols))
            })
            .clone()
    }

    /// The self-describing meta view `name:S,type:S,subv:V`.
    pub fn meta_meta(&self) -> View {
        if let Some(v) = self.meta_meta.get() {
            return v.clone();
        }
        let empty = self.empty_meta();
        self.meta_meta
            .get_or_init(|| {
                let cols = vec![
                    Column::from_strs(["name", "type", "subv"]),
                    Column::from_strs(["S", "S", "V"]),
                    Column::from_views(vec![empty.clone(), empty.clone(), empty]),
                ];
                View::from_data(ViewData::new(None, META_TYPES.to_vec(), cols))
            })
            .clone()
    }
}

pub fn config() -> EngineConfig {
    Context::with(|cx| cx.config())
}

pub fn set_config(cfg: EngineConfig) {
    Context::with(|cx| cx.set_config(cfg))
}

pub fn meta_meta() -> View {
    Context::with(|cx| cx.meta_meta())
}

pub fn empty_meta() -> View {
    Context::with(|cx| cx.empty_meta())
}

pub(crate) fn is_meta_meta(view: &View) -> bool {
    Context::with(|cx| cx.meta_meta.get().map_or(false, |m| Rc::ptr_eq(m.data(), view.data())))
}
