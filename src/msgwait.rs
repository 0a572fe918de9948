// Interleaving compositor events with the host's waits
//
// The compositor connection is not one of the host's waitable
// objects, so the thread that owns it polls it every time that
// thread waits. Real waits on that thread are kept short so we
// never go more than one interval without reading events.
//
// Austin Shafer - 2020
use crate::driver::{Backend, Driver, Host};
use crate::error::Result;
use utils::log;

/// A host waitable object
pub type WaitHandle = u64;

pub const WAIT_OBJECT_0: u32 = 0;
pub const WAIT_TIMEOUT: u32 = 258;
/// How long the dispatch thread may sit in a real wait
pub const PUMP_WAIT_MS: u32 = 7;

/// The read side of the compositor connection
pub trait DisplayPump {
    /// Start a read. Returns false if events are already queued,
    /// which have to be dispatched before a read can start.
    fn prepare_read(&mut self) -> bool;
    /// Finish a prepared read. Must not block if nothing is waiting.
    fn read_events(&mut self) -> Result<()>;
    /// Abandon a prepared read
    fn cancel_read(&mut self);
    /// Run the callbacks for every queued event
    fn dispatch_pending(&mut self) -> Result<usize>;
    fn flush(&mut self) -> Result<()>;
}

/// The host's own multi object wait
pub trait HostWait {
    fn wait_for_multiple_objects(
        &self,
        handles: &[WaitHandle],
        wait_all: bool,
        timeout: u32,
        alertable: bool,
    ) -> u32;
}

/// Read and dispatch whatever the compositor has sent
///
/// Returns true if events were already queued when we got here,
/// meaning the caller was woken for compositor work.
pub fn pump_events<P: DisplayPump>(pump: &mut P) -> Result<bool> {
    let queued = !pump.prepare_read();

    if queued {
        pump.dispatch_pending()?;
        while !pump.prepare_read() {
            pump.dispatch_pending()?;
        }
    }

    if let Err(e) = pump.flush() {
        pump.cancel_read();
        return Err(e);
    }
    pump.read_events()?;
    pump.dispatch_pending()?;

    Ok(queued)
}

impl<B: Backend, H: Host> Driver<B, H> {
    /// Wait for `handles` while keeping the compositor serviced
    ///
    /// On the dispatch thread this returns `WAIT_OBJECT_0 + count`
    /// when compositor events were handled instead of waiting.
    pub fn msg_wait_for_multiple_objects(
        &self,
        handles: &[WaitHandle],
        timeout: u32,
        wait_all: bool,
        alertable: bool,
    ) -> u32 {
        let count = handles.len() as u32;
        let host_wait = |ms| {
            self.d_host
                .wait_for_multiple_objects(handles, wait_all, ms, alertable)
        };

        if !self.d_ctx.is_dispatch_thread() {
            return host_wait(timeout);
        }

        // Never hold the driver lock across a host wait
        let serviced = {
            let mut st = self.state();
            match st.ds_backend.as_mut() {
                None => None,
                Some(backend) => Some(pump_events(backend)),
            }
        };

        let serviced = match serviced {
            None => {
                if count == 0 && timeout == 0 {
                    return WAIT_TIMEOUT;
                }
                return host_wait(timeout);
            }
            Some(Ok(s)) => s,
            Some(Err(e)) => {
                log::error!("Could not dispatch compositor events: {}", e);
                false
            }
        };

        self.apply_hotkeys();

        if serviced {
            return WAIT_OBJECT_0 + count;
        }
        if count == 0 && timeout == 0 {
            return WAIT_TIMEOUT;
        }

        return host_wait(timeout.min(PUMP_WAIT_MS));
    }
}
