//! Counter and controlled name input, rendered to stdout

use std::cell::RefCell;
use std::rc::Rc;
use hookcell::{HookError, Hooks, Scheduler, Setter};

#[derive(Clone)]
struct Controls {
    set_count: Setter<i32>,
    set_name: Setter<String>,
}

fn counter(controls: Rc<RefCell<Option<Controls>>>) -> impl Fn(&mut Hooks<'_>, &String) -> Result<String, HookError> {
    move |cx, title| {
        let (count, set_count) = cx.use_state(0)?;
        let (name, set_name) = cx.use_state(String::new())?;

        cx.use_effect_with(count, move || {
            println!("   [Effect] count changed to {count}");
        })?;

        *controls.borrow_mut() = Some(Controls { set_count, set_name });
        Ok(format!("{title}: {count} clicks, name = {name:?}"))
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Counter Example ===\n");

    let scheduler = Scheduler::new();
    let controls = Rc::new(RefCell::new(None));

    println!("1. Mounting the counter");
    let handle = scheduler.mount(counter(controls.clone()), "Counter".to_string(), |output: String| {
        println!("   [Render] {output}");
    });

    let current = controls.borrow().clone();
    let Some(Controls { set_count, set_name }) = current else {
        return;
    };

    println!("\n2. Two clicks in one batch render once");
    scheduler.batch(|| {
        set_count.update(|n| n + 1);
        set_count.update(|n| n + 1);
    });

    println!("\n3. Typing into the name field");
    for typed in ["A", "Ad", "Ada"] {
        scheduler.batch(|| set_name.set(typed.to_string()));
    }

    println!("\n4. Re-rendering by hand, no state change");
    handle.request_render();
    scheduler.flush();

    println!("\n5. Unmounting; later clicks are ignored");
    scheduler.unmount(&handle);
    set_count.set(100);
    println!("   renders after unmount: {}", scheduler.flush());
}
