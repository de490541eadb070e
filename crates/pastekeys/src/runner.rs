use crate::activator::{
    DEFAULT_PASTE_DELAY, EnigoKeystroke, PasteActivator, PasteKeystroke, PasteQueue,
    SystemClipboard,
};
use crate::command::{Command, Response};
use crate::coordinator::Coordinator;
use crate::dispatcher::Dispatcher;
use crate::store::SnippetStore;
use crate::{Error, Result};
use global_hotkey::GlobalHotKeyEvent;
use global_hotkey::hotkey::Modifiers;
use std::io::BufRead;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tao::event::Event;
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use tracing::{debug, error, info, trace, warn};

/// Configuration for a pastekeys daemon
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Modifier held with every palette key
    pub modifiers: Modifiers,
    /// Delay between the clipboard write and the paste
    pub paste_delay: Duration,
    /// Accept edit commands as JSON lines on stdin
    pub read_stdin: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            modifiers: Modifiers::ALT,
            paste_delay: DEFAULT_PASTE_DELAY,
            read_stdin: true,
        }
    }
}

impl RunnerConfig {
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_paste_delay(mut self, delay: Duration) -> Self {
        self.paste_delay = delay;
        self
    }

    pub fn with_stdin(mut self, read_stdin: bool) -> Self {
        self.read_stdin = read_stdin;
        self
    }
}

/// Everything the event loop wakes up for besides platform events.
#[derive(Debug)]
enum UserEvent {
    Hotkey(GlobalHotKeyEvent),
    Command(Command),
    /// A stdin line that did not parse
    Invalid(String),
    /// A queued paste has waited out its delay
    Paste,
    Shutdown,
}

/// Runs the hotkey daemon on the current thread.
pub struct Runner {
    config: RunnerConfig,
    store: SnippetStore,
}

impl Runner {
    pub fn new(config: RunnerConfig, store: SnippetStore) -> Self {
        Self { config, store }
    }

    /// Run the daemon
    ///
    /// This will:
    /// 1. Create a tao event loop on the current thread (must be main thread on macOS)
    /// 2. Register the palette hotkeys for the current snippets
    /// 3. Start the paste queue, and the stdin command reader if enabled
    /// 4. Run the event loop until a `quit` command or Ctrl+C
    ///
    /// Paste keystrokes are emitted from the event loop, on this thread.
    ///
    /// On macOS this never returns; the process exits with the event loop.
    pub fn run(self) -> Result<()> {
        info!(
            "Starting pastekeys with {} snippets from {}",
            self.store.len(),
            self.store.location()
        );

        let event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| Error::HotkeyOperation(format!("Failed to create tokio runtime: {e}")))?;

        let dispatcher = Dispatcher::new(self.config.modifiers)?;
        let paste_proxy = event_loop.create_proxy();
        let queue = PasteQueue::spawn(runtime.handle(), move || {
            if paste_proxy.send_event(UserEvent::Paste).is_err() {
                trace!("Event loop gone, dropping paste");
            }
        });
        let keystroke = EnigoKeystroke;
        let activator =
            PasteActivator::new(SystemClipboard::new(), queue).with_delay(self.config.paste_delay);
        let mut coordinator = Coordinator::new(self.store, dispatcher, activator);

        forward_hotkeys(event_loop.create_proxy());

        let proxy = event_loop.create_proxy();
        runtime.spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupted, shutting down");
                    let _ = proxy.send_event(UserEvent::Shutdown);
                }
                Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
            }
        });

        if self.config.read_stdin {
            spawn_stdin_reader(event_loop.create_proxy());
        }

        info!("Starting tao event loop...");
        event_loop.run(move |event, _, control_flow| {
            *control_flow = ControlFlow::Wait;
            // Keeps the paste queue and signal task alive for the loop's lifetime.
            let _ = &runtime;

            match event {
                Event::UserEvent(UserEvent::Hotkey(hotkey)) => {
                    if let Some(outcome) = coordinator.handle_hotkey(hotkey.id(), hotkey.state()) {
                        debug!("Hotkey outcome: {:?}", outcome);
                    }
                }
                Event::UserEvent(UserEvent::Command(command)) => {
                    let quit = command == Command::Quit;
                    let response = coordinator.apply(command);
                    println!("{}", response.to_line());
                    if quit {
                        *control_flow = ControlFlow::Exit;
                    }
                }
                Event::UserEvent(UserEvent::Paste) => {
                    if let Err(e) = keystroke.paste() {
                        warn!("Synthetic paste failed: {}", e);
                    }
                }
                Event::UserEvent(UserEvent::Invalid(message)) => {
                    println!("{}", Response::error(message).to_line());
                }
                Event::UserEvent(UserEvent::Shutdown) => {
                    *control_flow = ControlFlow::Exit;
                }
                Event::NewEvents(_) | Event::MainEventsCleared | Event::RedrawEventsCleared => {}
                Event::LoopDestroyed => {
                    coordinator.shutdown();
                    info!("Event loop destroyed");
                }
                _ => {
                    trace!("Event loop received: {:?}", event);
                }
            }
        });

        // The event loop runs forever and only exits when control flow is set to Exit
        #[allow(unreachable_code)]
        Ok(())
    }
}

/// Route global hotkey events into the event loop.
fn forward_hotkeys(proxy: EventLoopProxy<UserEvent>) {
    let proxy = Mutex::new(proxy);
    GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
        let proxy = proxy.lock().unwrap_or_else(|e| e.into_inner());
        if proxy.send_event(UserEvent::Hotkey(event)).is_err() {
            trace!("Event loop gone, dropping hotkey event");
        }
    }));
}

/// Read JSON commands from stdin, one per line.
///
/// End of input only stops the reader; the daemon keeps serving hotkeys.
fn spawn_stdin_reader(proxy: EventLoopProxy<UserEvent>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let event = match Command::parse(&line) {
                Ok(command) => UserEvent::Command(command),
                Err(e) => UserEvent::Invalid(format!("Bad command: {e}")),
            };
            if proxy.send_event(event).is_err() {
                break;
            }
        }
        debug!("Stdin reader finished");
    });
}
