// Example: slots follow their records across a reorder when keyed by a stable id.
use virtualist::{Error, Reconciler, ReconcilerOptions, SlotContainer, SlotFactory};

#[derive(Clone, Debug)]
struct Row {
    id: u64,
    title: &'static str,
}

#[derive(Default)]
struct Labels {
    next: u32,
}

impl SlotFactory<Row> for Labels {
    type Slot = (u32, String);

    fn create(&mut self, index: usize) -> Result<Self::Slot, Error> {
        self.next += 1;
        println!("create slot {} for index {index}", self.next);
        Ok((self.next, String::new()))
    }

    fn update(&mut self, slot: &mut Self::Slot, item: &Row, index: usize) -> Result<(), Error> {
        slot.1 = format!("#{index} {}", item.title);
        Ok(())
    }
}

#[derive(Default)]
struct Column {
    order: Vec<u32>,
}

impl SlotContainer<(u32, String)> for Column {
    fn attach(&mut self, slot: &(u32, String), before: Option<&(u32, String)>) {
        self.order.retain(|s| *s != slot.0);
        match before.and_then(|b| self.order.iter().position(|s| *s == b.0)) {
            Some(pos) => self.order.insert(pos, slot.0),
            None => self.order.push(slot.0),
        }
    }

    fn detach(&mut self, slot: &(u32, String)) {
        self.order.retain(|s| *s != slot.0);
    }
}

fn main() -> Result<(), Error> {
    let rows = vec![
        Row { id: 10, title: "alpha" },
        Row { id: 11, title: "beta" },
        Row { id: 12, title: "gamma" },
        Row { id: 13, title: "delta" },
    ];
    let mut r = Reconciler::new(
        ReconcilerOptions::new_with_key(|row: &Row| row.id).with_recycling(true),
        Labels::default(),
    );
    let mut column = Column::default();

    r.set_items(rows.clone());
    r.set_range(0, 4);
    let report = r.render(&mut column)?;
    println!("initial: created={} order={:?}", report.created, column.order);

    let mut reversed = rows;
    reversed.reverse();
    r.set_items(reversed);
    r.set_range(0, 4);
    let report = r.render(&mut column)?;
    println!(
        "reversed: created={} moved={} order={:?}",
        report.created, report.moved, column.order
    );
    r.for_each_active(|index, id| {
        if let Some(slot) = r.slot(id) {
            println!("  {index}: slot {} shows {:?}", slot.0, slot.1);
        }
    });
    Ok(())
}
