// Example: range and positions for a large list, then a measured item ahead of the viewport.
use virtualist::{Align, Extent, FlowLayout, LayoutEngine, LayoutFact, LayoutOptions};

fn main() {
    let mut layout = FlowLayout::new(
        LayoutOptions::new(1_000_000)
            .with_fixed_extent(24.0)
            .with_overhang(120.0),
    );
    layout.set_viewport_extent(600.0);
    layout.set_scroll_position(240_000.0);

    let mut facts = Vec::new();
    layout.reflow(&mut |f| facts.push(f));
    println!("facts={facts:?}");
    println!("total_extent={}", layout.total_extent());
    println!("range={:?}", layout.range());
    println!("anchor={:?}", layout.anchor());

    // A row above the anchor turns out taller than estimated: the scroll position follows it.
    layout.update_extents(&[(9_990, Extent::new(64.0))]);
    layout.reflow(&mut |f| {
        if let LayoutFact::ScrollError { dx, dy } = f {
            println!("scroll correction dx={dx} dy={dy}");
        }
    });
    println!("scroll_position={}", layout.scroll_position());

    layout.scroll_to_index(999_999, Align::End);
    layout.reflow(&mut |_| {});
    println!(
        "after scroll_to_index: scroll_position={} range={:?}",
        layout.scroll_position(),
        layout.range()
    );
}
