// Example: a coordinator driving an in-memory host with a frame-based scheduler.
//
// A real adapter would create widgets in `with_factory`, write them in `with_update` and read
// their laid-out size in `Host::measure`.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use virtualist::{Direction, HostError, Position, SlotContainer};
use virtualist_adapter::{
    Coordinator, Host, ListConfig, Measurement, QueuedScheduler, Rect, ViewBounds,
};

#[derive(Default)]
struct Screen {
    scroll_top: f64,
    rows: Vec<u32>,
    text: HashMap<u32, String>,
    top: HashMap<u32, f64>,
    height: f64,
}

struct ScreenHost(Rc<RefCell<Screen>>);

impl SlotContainer<u32> for ScreenHost {
    fn attach(&mut self, slot: &u32, before: Option<&u32>) {
        let mut s = self.0.borrow_mut();
        s.rows.retain(|r| r != slot);
        match before.and_then(|b| s.rows.iter().position(|r| r == b)) {
            Some(pos) => s.rows.insert(pos, *slot),
            None => s.rows.push(*slot),
        }
    }

    fn detach(&mut self, slot: &u32) {
        self.0.borrow_mut().rows.retain(|r| r != slot);
    }
}

impl Host<u32> for ScreenHost {
    fn view(&self) -> ViewBounds {
        ViewBounds {
            container: Rect::new(0.0, -self.0.borrow().scroll_top, 80.0, 0.0),
            scroller: Rect::new(0.0, 0.0, 80.0, 240.0),
        }
    }

    fn measure(&mut self, slot: &u32) -> Result<Measurement, HostError> {
        let s = self.0.borrow();
        let text = s
            .text
            .get(slot)
            .ok_or_else(|| HostError::new("unknown slot"))?;
        // One 16px line per 40 characters.
        let lines = text.len().div_ceil(40).max(1);
        Ok(Measurement::new(80.0, lines as f64 * 16.0))
    }

    fn set_position(&mut self, slot: &u32, position: Position) {
        self.0.borrow_mut().top.insert(*slot, position.top);
    }

    fn set_min_extent(&mut self, _direction: Direction, extent: f64) {
        self.0.borrow_mut().height = extent;
    }

    fn scroll_by(&mut self, _dx: f64, dy: f64) {
        self.0.borrow_mut().scroll_top += dy;
    }
}

fn main() -> Result<(), virtualist_adapter::Error> {
    let screen = Rc::new(RefCell::new(Screen::default()));
    let messages: Vec<String> = (0..500)
        .map(|i| "lorem ipsum ".repeat(i % 9 + 1))
        .collect();

    let (created, writer) = (Rc::new(RefCell::new(0u32)), screen.clone());
    let config = ListConfig::new(messages)
        .with_fixed_extent(16.0)
        .with_overhang(64.0)
        .with_recycling(true)
        .with_factory(move |_| {
            let mut n = created.borrow_mut();
            *n += 1;
            Ok(*n)
        })
        .with_update(move |slot, text: &String, _| {
            writer.borrow_mut().text.insert(*slot, text.clone());
            Ok(())
        });

    let mut list: Coordinator<_, _, ScreenHost, _, QueuedScheduler> =
        Coordinator::from_config(config, QueuedScheduler::new());
    list.attach(ScreenHost(screen.clone()))?;

    list.run_microtasks()?;
    println!(
        "rendered {} rows, estimated height {}",
        screen.borrow().rows.len(),
        screen.borrow().height
    );

    list.run_frame()?;
    println!(
        "after measuring: height {} range {:?}",
        screen.borrow().height,
        list.reconciler().range()
    );

    screen.borrow_mut().scroll_top = 2_000.0;
    list.on_scroll()?;
    while !list.scheduler().is_empty() {
        list.run_frame()?;
    }
    let first = screen.borrow().rows.first().copied();
    println!(
        "scrolled: range {:?}, first row {:?} at {:?}",
        list.reconciler().range(),
        first,
        first.and_then(|slot| screen.borrow().top.get(&slot).copied())
    );

    list.detach();
    Ok(())
}
