use crate::*;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use std::collections::HashMap;
use std::vec;

use virtualist::{
    Align, Direction, FlowLayout, HostError, LayoutEngine, Position, Range, SlotContainer,
};

#[derive(Debug)]
struct World {
    scroller: Rect,
    scroll: (f64, f64),
    children: Vec<u32>,
    positions: HashMap<u32, Position>,
    // slot -> item it currently shows
    content: HashMap<u32, u64>,
    // item -> measured size on both axes
    sizes: HashMap<u64, f64>,
    min_extent: Option<(Direction, f64)>,
    scrolls: Vec<(f64, f64)>,
    created: u32,
    removed: usize,
    measured: usize,
    fail_measure: bool,
}

impl Default for World {
    fn default() -> Self {
        Self {
            scroller: Rect::new(0.0, 0.0, 300.0, 500.0),
            scroll: (0.0, 0.0),
            children: Vec::new(),
            positions: HashMap::new(),
            content: HashMap::new(),
            sizes: HashMap::new(),
            min_extent: None,
            scrolls: Vec::new(),
            created: 0,
            removed: 0,
            measured: 0,
            fail_measure: false,
        }
    }
}

type Shared = Rc<RefCell<World>>;

#[derive(Debug)]
struct FakeHost(Shared);

impl SlotContainer<u32> for FakeHost {
    fn attach(&mut self, slot: &u32, before: Option<&u32>) {
        let mut w = self.0.borrow_mut();
        w.children.retain(|s| s != slot);
        match before.and_then(|b| w.children.iter().position(|s| s == b)) {
            Some(pos) => w.children.insert(pos, *slot),
            None => w.children.push(*slot),
        }
    }

    fn detach(&mut self, slot: &u32) {
        self.0.borrow_mut().children.retain(|s| s != slot);
    }
}

impl Host<u32> for FakeHost {
    fn view(&self) -> ViewBounds {
        let w = self.0.borrow();
        ViewBounds {
            container: Rect::new(-w.scroll.0, -w.scroll.1, 0.0, 0.0),
            scroller: w.scroller,
        }
    }

    fn measure(&mut self, slot: &u32) -> Result<Measurement, HostError> {
        let mut w = self.0.borrow_mut();
        if w.fail_measure {
            return Err(HostError::new("layout not ready"));
        }
        w.measured += 1;
        let item = w.content.get(slot).copied().unwrap_or_default();
        let size = w.sizes.get(&item).copied().unwrap_or(50.0);
        Ok(Measurement::new(size, size))
    }

    fn set_position(&mut self, slot: &u32, position: Position) {
        self.0.borrow_mut().positions.insert(*slot, position);
    }

    fn set_min_extent(&mut self, direction: Direction, extent: f64) {
        self.0.borrow_mut().min_extent = Some((direction, extent));
    }

    fn scroll_by(&mut self, dx: f64, dy: f64) {
        let mut w = self.0.borrow_mut();
        w.scrolls.push((dx, dy));
        w.scroll.0 += dx;
        w.scroll.1 += dy;
    }
}

fn config(world: &Shared, items: Vec<u64>) -> ListConfig<u64, u32, u64> {
    let (w1, w2, w3) = (world.clone(), world.clone(), world.clone());
    ListConfig::new_with_key(items, |item: &u64| *item)
        .with_fixed_extent(50.0)
        .with_overhang(150.0)
        .with_recycling(true)
        .with_factory(move |_| {
            let mut w = w1.borrow_mut();
            let slot = w.created;
            w.created += 1;
            Ok(slot)
        })
        .with_update(move |slot, item, _| {
            w2.borrow_mut().content.insert(*slot, *item);
            Ok(())
        })
        .with_remove(move |slot| {
            let mut w = w3.borrow_mut();
            w.content.remove(&slot);
            w.removed += 1;
        })
}

type List<S = ImmediateScheduler> =
    Coordinator<u64, CallbackFactory<u64, u32>, FakeHost, FlowLayout, S, u64>;

fn attached(world: &Shared, count: u64) -> List {
    let mut list: List =
        Coordinator::from_config(config(world, (0..count).collect()), ImmediateScheduler);
    list.attach(FakeHost(world.clone())).unwrap();
    list
}

fn position_of(list: &List, world: &Shared, index: usize) -> Option<Position> {
    let id = list.reconciler().slot_for(index)?;
    let slot = list.reconciler().slot(id)?;
    world.borrow().positions.get(slot).copied()
}

fn slots_in_index_order(list: &List) -> Vec<u32> {
    let r = list.reconciler();
    let mut out = Vec::new();
    r.for_each_active(|_, id| out.extend(r.slot(id).copied()));
    out
}

#[test]
fn attach_renders_measures_and_positions() {
    let world = Shared::default();
    let list = attached(&world, 1000);

    assert_eq!(list.reconciler().range(), Range::new(0, 13));
    let w = world.borrow();
    assert_eq!(w.created, 13);
    assert_eq!(w.measured, 13);
    assert_eq!(w.min_extent, Some((Direction::Vertical, 50_000.0)));
    drop(w);

    assert_eq!(
        position_of(&list, &world, 3),
        Some(Position {
            left: 0.0,
            top: 150.0
        })
    );
    assert_eq!(world.borrow().children, slots_in_index_order(&list));
    assert!(!list.is_pending(Task::Render));
    assert!(!list.is_pending(Task::Measure));
    assert!(list.is_stable());
}

#[test]
fn measured_sizes_move_following_slots() {
    let world = Shared::default();
    world.borrow_mut().sizes.insert(0, 80.0);
    let list = attached(&world, 1000);

    assert_eq!(list.layout().total_extent(), 50_030.0);
    assert_eq!(
        world.borrow().min_extent,
        Some((Direction::Vertical, 50_030.0))
    );
    assert_eq!(position_of(&list, &world, 1).map(|p| p.top), Some(80.0));
    assert_eq!(position_of(&list, &world, 12).map(|p| p.top), Some(630.0));
    assert!(world.borrow().scrolls.is_empty());
}

#[test]
fn growth_before_the_anchor_scrolls_the_host() {
    let world = Shared::default();
    let mut list = attached(&world, 1000);

    world.borrow_mut().scroll.1 = 1_000.0;
    list.on_scroll().unwrap();
    assert_eq!(list.reconciler().range(), Range::new(17, 16));
    assert!(list.is_stable());

    world.borrow_mut().sizes.insert(17, 120.0);
    list.request_remeasure(Some(17)).unwrap();

    let w = world.borrow();
    assert_eq!(w.scrolls.last(), Some(&(0.0, 70.0)));
    assert_eq!(w.scroll.1, 1_070.0);
    drop(w);
    assert_eq!(list.layout().scroll_position(), 1_070.0);
    assert_eq!(position_of(&list, &world, 20).map(|p| p.top), Some(1_070.0));
}

#[test]
fn scrolling_settles_and_evicts_deferred_slots() {
    let world = Shared::default();
    let mut list = attached(&world, 1000);

    world.borrow_mut().scroll.1 = 300.0;
    list.on_scroll().unwrap();

    let r = list.reconciler();
    assert_eq!(r.range(), Range::new(3, 16));
    assert!(!r.is_incremental());
    assert_eq!(r.active_len(), 16);
    assert_eq!(r.pool_len(), 3);
    assert_eq!(world.borrow().children, slots_in_index_order(&list));
    assert_eq!(position_of(&list, &world, 18).map(|p| p.top), Some(900.0));
}

#[test]
fn emptying_the_list_pools_every_slot() {
    let world = Shared::default();
    let mut list = attached(&world, 1000);

    list.set_items(Vec::new()).unwrap();
    assert_eq!(list.reconciler().range(), Range::EMPTY);
    assert_eq!(list.reconciler().pool_len(), 13);
    let w = world.borrow();
    assert!(w.children.is_empty());
    assert_eq!(w.removed, 0);
    assert_eq!(w.min_extent, Some((Direction::Vertical, 0.0)));
}

#[test]
fn prepending_keeps_the_anchored_record_in_place() {
    let world = Shared::default();
    let mut list = attached(&world, 1000);
    world.borrow_mut().scroll.1 = 1_000.0;
    list.on_scroll().unwrap();

    list.splice(0..0, 5_000..5_010).unwrap();

    let w = world.borrow();
    assert_eq!(w.scrolls.last(), Some(&(0.0, 500.0)));
    assert_eq!(w.scroll.1, 1_500.0);
    drop(w);
    let id = list.reconciler().slot_for(30).unwrap();
    assert_eq!(list.reconciler().key_of(id), Some(&20));
    assert_eq!(position_of(&list, &world, 30).map(|p| p.top), Some(1_500.0));
}

#[test]
fn direction_change_remeasures_along_the_new_axis() {
    let world = Shared::default();
    world.borrow_mut().scroller = Rect::new(0.0, 0.0, 400.0, 500.0);
    let mut list = attached(&world, 1000);
    assert_eq!(list.reconciler().range(), Range::new(0, 13));

    list.set_direction(Direction::Horizontal).unwrap();
    assert_eq!(list.reconciler().range(), Range::new(0, 11));
    assert_eq!(
        world.borrow().min_extent,
        Some((Direction::Horizontal, 50_000.0))
    );
    assert_eq!(
        position_of(&list, &world, 2),
        Some(Position {
            left: 100.0,
            top: 0.0
        })
    );
    assert!(list.layout().is_measured(10));
}

#[test]
fn detach_destroys_every_slot() {
    let world = Shared::default();
    let mut list = attached(&world, 100);
    list.set_items((0..4).collect()).unwrap();
    assert_eq!(list.reconciler().pool_len(), 9);

    let host = list.detach();
    assert!(host.is_some());
    let w = world.borrow();
    assert_eq!(w.removed, 13);
    assert!(w.content.is_empty());
    assert!(w.children.is_empty());
    drop(w);

    assert_eq!(list.run(Task::Render), Err(Error::Detached));
    assert!(list.detach().is_none());
}

#[test]
fn missing_factory_is_a_configuration_error() {
    let world = Shared::default();
    let mut list: Coordinator<u64, CallbackFactory<u64, u32>, FakeHost> =
        Coordinator::from_config(ListConfig::new(vec![1, 2, 3]), ImmediateScheduler);

    let err = list.attach(FakeHost(world.clone())).unwrap_err();
    assert_eq!(
        err,
        Error::Core(virtualist::Error::MissingOption("factory_fn"))
    );
    assert_eq!(
        err.to_string(),
        "missing required option `factory_fn`"
    );
    // Nothing from the aborted pass reached the host.
    assert_eq!(world.borrow().min_extent, None);
    assert!(list.is_pending(Task::Render));
}

#[test]
fn failed_measurement_leaves_the_layout_untouched() {
    let world = Shared::default();
    world.borrow_mut().fail_measure = true;
    world.borrow_mut().sizes.insert(0, 80.0);
    let mut list: List =
        Coordinator::from_config(config(&world, (0..100).collect()), ImmediateScheduler);

    let err = list.attach(FakeHost(world.clone())).unwrap_err();
    assert!(matches!(
        err,
        Error::Core(virtualist::Error::Host {
            callback: "measure",
            ..
        })
    ));
    assert!(!list.layout().is_measured(0));
    assert!(list.is_pending(Task::Measure));

    world.borrow_mut().fail_measure = false;
    list.run(Task::Measure).unwrap();
    assert!(list.layout().is_measured(0));
    assert_eq!(list.layout().total_extent(), 5_030.0);
    assert!(!list.is_pending(Task::Measure));
}

#[test]
fn queued_scheduler_defers_passes_to_the_host() {
    let world = Shared::default();
    let mut list: List<QueuedScheduler> =
        Coordinator::from_config(config(&world, (0..1000).collect()), QueuedScheduler::new());

    list.attach(FakeHost(world.clone())).unwrap();
    assert!(world.borrow().children.is_empty());
    assert_eq!(list.scheduler().len(), 1);

    // Already scheduled: no second render is queued.
    list.scroll_to_index(10, Align::Start).unwrap();
    assert_eq!(list.scheduler().len(), 1);

    list.run_microtasks().unwrap();
    assert_eq!(world.borrow().children.len(), 16);
    assert_eq!(world.borrow().measured, 0);
    assert_eq!(list.scheduler().frame_len(), 1);

    list.run_frame().unwrap();
    assert_eq!(world.borrow().measured, 16);
    assert_eq!(world.borrow().scroll.1, 500.0);
    assert!(list.scheduler().is_empty());
}

#[test]
fn nested_list_asks_its_parent_to_remeasure() {
    let parent_world = Shared::default();
    let mut parent = attached(&parent_world, 100);
    let before = parent_world.borrow().measured;

    // The child lives in the slot of item 2 and grows once rendered.
    let child_world = Shared::default();
    let mut child: List =
        Coordinator::from_config(config(&child_world, (0..4).collect()), ImmediateScheduler);
    child.set_parent(Some(parent.child_link(2)));
    parent_world.borrow_mut().sizes.insert(2, 200.0);
    child.attach(FakeHost(child_world.clone())).unwrap();

    parent.poll_children().unwrap();
    assert_eq!(parent_world.borrow().measured, before + 1);
    assert_eq!(
        position_of(&parent, &parent_world, 3).map(|p| p.top),
        Some(300.0)
    );

    // A list never reacts to its own notifications.
    let own = parent.child_link(1);
    assert!(own.notify(parent.id()));
    parent.poll_children().unwrap();
    assert_eq!(parent_world.borrow().measured, before + 1);

    drop(parent);
    assert!(!child.parent().unwrap().notify(child.id()));
}

#[test]
#[should_panic(expected = "out of bounds")]
fn remeasure_outside_items_fails_fast() {
    let world = Shared::default();
    let mut list = attached(&world, 10);
    let _ = list.request_remeasure(Some(10));
}

#[test]
fn view_clips_container_to_scroller() {
    let scroller = Rect::new(0.0, 100.0, 300.0, 500.0);

    // Container starts 200px below the scroller's top.
    let below = ViewBounds {
        container: Rect::new(0.0, 300.0, 300.0, 2_000.0),
        scroller,
    };
    assert_eq!(below.viewport(Direction::Vertical), (300.0, 0.0));

    // Container scrolled 400px past the top.
    let above = ViewBounds {
        container: Rect::new(0.0, -300.0, 300.0, 2_000.0),
        scroller,
    };
    assert_eq!(above.viewport(Direction::Vertical), (500.0, 400.0));

    // Entirely below the visible area.
    let hidden = ViewBounds {
        container: Rect::new(0.0, 900.0, 300.0, 2_000.0),
        scroller,
    };
    assert_eq!(hidden.viewport(Direction::Vertical), (0.0, 0.0));
    assert_eq!(hidden.viewport(Direction::Horizontal), (300.0, 0.0));

    // Scrolled entirely past the top: nothing of the container is left to show.
    let gone = ViewBounds {
        container: Rect::new(0.0, -2_500.0, 300.0, 2_000.0),
        scroller,
    };
    assert_eq!(gone.viewport(Direction::Vertical), (0.0, 2_600.0));

    // Its trailing edge still clips once scrolled into the last 200px.
    let tail = ViewBounds {
        container: Rect::new(0.0, -1_700.0, 300.0, 2_000.0),
        scroller,
    };
    assert_eq!(tail.viewport(Direction::Vertical), (200.0, 1_800.0));

    // A container the host has not sized yet counts as long as the list.
    let unsized_bounds = ViewBounds {
        container: Rect::new(0.0, -300.0, 300.0, 0.0),
        scroller,
    };
    assert_eq!(unsized_bounds.viewport(Direction::Vertical), (0.0, 400.0));
    assert_eq!(
        unsized_bounds
            .with_min_extent(Direction::Vertical, 2_000.0)
            .viewport(Direction::Vertical),
        (500.0, 400.0)
    );
}

#[test]
fn list_scrolled_out_of_view_keeps_a_single_slot() {
    let world = Shared::default();
    let mut list = attached(&world, 100);
    assert_eq!(list.reconciler().range(), Range::new(0, 13));

    // The list is 5000px long; scroll the scroller 6000px past the list's top.
    world.borrow_mut().scroll.1 = 6_000.0;
    list.on_scroll().unwrap();
    assert_eq!(list.layout().viewport_extent(), 0.0);
    assert_eq!(list.reconciler().range().num, 1);
}

mod props {
    use super::*;
    use proptest::prelude::*;

    fn check_scroll_sequence(sizes: &[u8], scrolls: &[u16]) -> Result<(), TestCaseError> {
        let world = Shared::default();
        for (item, &size) in sizes.iter().enumerate() {
            world
                .borrow_mut()
                .sizes
                .insert(item as u64, 10.0 + size as f64);
        }
        let mut list = attached(&world, sizes.len() as u64);

        for &scroll in scrolls {
            world.borrow_mut().scroll.1 = scroll as f64;
            list.on_scroll().map_err(|e| TestCaseError::fail(e.to_string()))?;

            let range = list.reconciler().range();
            for index in range.indexes() {
                let expected = list.layout().item_offset(index);
                let actual = position_of(&list, &world, index).map(|p| p.top);
                prop_assert_eq!(actual, expected, "index {}", index);
            }
            prop_assert_eq!(&world.borrow().children, &slots_in_index_order(&list));
            prop_assert!(!list.is_pending(Task::Render));
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn host_positions_track_layout_offsets(
            sizes in proptest::collection::vec(any::<u8>(), 1..80),
            scrolls in proptest::collection::vec(0u16..6_000, 1..12),
        ) {
            check_scroll_sequence(&sizes, &scrolls)?;
        }
    }
}
