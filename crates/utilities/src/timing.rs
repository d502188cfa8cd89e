use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use log::info;

/// Collects the wall clock time of named phases, printed at the end of a tool run.
#[derive(Default)]
pub struct Timing {
    results: Rc<RefCell<Vec<(String, f32)>>>,
}

/// A running measurement that is registered in its [Timing] when finished.
pub struct Timer {
    name: String,
    start: Instant,
    results: Rc<RefCell<Vec<(String, f32)>>>,
    registered: bool,
}

impl Timing {
    /// Creates a new timing object to track timers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new timer with the given name.
    pub fn start(&mut self, name: &str) -> Timer {
        Timer {
            name: name.to_string(),
            start: Instant::now(),
            results: self.results.clone(),
            registered: false,
        }
    }

    /// Returns the measured phases in the order in which they finished.
    pub fn results(&self) -> Vec<(String, f32)> {
        self.results.borrow().clone()
    }

    /// Prints all the finished timers.
    pub fn print(&self) {
        for (name, time) in self.results.borrow().iter() {
            eprintln!("Time {}: {:.3}s", name, time);
        }
    }
}

impl Timer {
    /// Finishes the measurement and registers the elapsed time.
    pub fn finish(&mut self) {
        let time = self.start.elapsed().as_secs_f64();
        info!("Time {}: {:.3}s", self.name, time);

        self.results.borrow_mut().push((self.name.clone(), time as f32));
        self.registered = true;
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.registered {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing() {
        let mut timing = Timing::new();

        let mut first = timing.start("first");
        first.finish();

        {
            // Dropped timers are registered as well.
            let _second = timing.start("second");
        }

        let names: Vec<String> = timing.results().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
