//! Parallel discovery and reading of `.graphql` sources. Workers only walk
//! directories and read files; compilation stays on the calling thread
//! because the generator is deliberately single-threaded.
use crate::cli::PrintableMessage;
use crossbeam_channel as channel;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
enum Message {
    Work(Work),
    Quit,
}

#[derive(Debug)]
enum Work {
    DirEntry(PathBuf),
    GraphQl(PathBuf),
}

#[derive(Debug)]
pub enum WorkOutput {
    Source { path: PathBuf, contents: String },
    Failure(PrintableMessage),
}

fn skip_directory(path: &Path) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => name == "__generated__" || name == "node_modules" || name.starts_with('.'),
        None => false,
    }
}

impl Work {
    fn run_dir_entry(
        &self,
        path: &Path,
        tx: &channel::Sender<Message>,
        output: &channel::Sender<WorkOutput>,
    ) {
        let readdir = match fs::read_dir(path) {
            Ok(readdir) => readdir,
            Err(io_error) => {
                let message =
                    PrintableMessage::new_compile_error_from_read_io_error(&io_error, path);
                output.send(WorkOutput::Failure(message)).unwrap();
                return;
            }
        };
        for raw_entry in readdir {
            let entry_path = match raw_entry {
                Ok(entry) => entry.path(),
                Err(io_error) => {
                    let message =
                        PrintableMessage::new_compile_error_from_read_io_error(&io_error, path);
                    output.send(WorkOutput::Failure(message)).unwrap();
                    continue;
                }
            };
            if entry_path.is_dir() && !skip_directory(&entry_path) {
                tx.send(Message::Work(Work::DirEntry(entry_path))).unwrap();
            } else if entry_path.is_file()
                && entry_path.extension().map_or(false, |ext| ext == "graphql")
            {
                tx.send(Message::Work(Work::GraphQl(entry_path))).unwrap();
            }
        }
    }

    fn run_graphql(&self, path: &Path, output: &channel::Sender<WorkOutput>) {
        match fs::read_to_string(path) {
            Ok(contents) => {
                output
                    .send(WorkOutput::Source {
                        path: path.to_path_buf(),
                        contents,
                    })
                    .unwrap();
            }
            Err(io_error) => {
                let message =
                    PrintableMessage::new_compile_error_from_read_io_error(&io_error, path);
                output.send(WorkOutput::Failure(message)).unwrap();
            }
        }
    }

    fn run(&self, tx: &channel::Sender<Message>, output: &channel::Sender<WorkOutput>) {
        match self {
            Work::DirEntry(path) => self.run_dir_entry(path, tx, output),
            Work::GraphQl(path) => self.run_graphql(path, output),
        }
    }
}

struct Worker {
    threads: usize,
    is_waiting: bool,
    is_quitting: bool,
    num_waiting: Arc<AtomicUsize>,
    num_quitting: Arc<AtomicUsize>,
    tx: channel::Sender<Message>,
    rx: channel::Receiver<Message>,
    output: channel::Sender<WorkOutput>,
}

impl Worker {
    fn run(mut self) {
        while let Some(work) = self.pop_work() {
            work.run(&self.tx, &self.output);
        }
    }

    fn pop_work(&mut self) -> Option<Work> {
        loop {
            match self.rx.try_recv() {
                Ok(Message::Work(work)) => {
                    self.set_waiting(false);
                    self.set_quitting(false);
                    return Some(work);
                }
                Ok(Message::Quit) => {
                    self.set_waiting(true);
                    self.set_quitting(true);
                    loop {
                        let nwait = self.num_waiting();
                        let nquit = self.num_quitting();
                        // If the number of waiting workers dropped, then abort our attempt to quit.
                        // Sometimes work will come back.
                        if nwait < self.threads {
                            break;
                        }
                        // If all workers are in this quit loop, then we can stop.
                        if nquit == self.threads {
                            return None;
                        }
                    }
                }
                Err(_) => {
                    self.set_waiting(true);
                    self.set_quitting(false);
                    if self.num_waiting() == self.threads {
                        for _ in 0..self.threads {
                            self.tx.send(Message::Quit).unwrap();
                        }
                    } else {
                        // Let producers catch up without burning the CPU
                        thread::sleep(Duration::from_millis(1));
                    }
                }
            }
        }
    }

    fn num_waiting(&self) -> usize {
        self.num_waiting.load(Ordering::SeqCst)
    }

    fn num_quitting(&self) -> usize {
        self.num_quitting.load(Ordering::SeqCst)
    }

    fn set_waiting(&mut self, desired: bool) {
        if desired && !self.is_waiting {
            self.is_waiting = true;
            self.num_waiting.fetch_add(1, Ordering::SeqCst);
        } else if !desired && self.is_waiting {
            self.is_waiting = false;
            self.num_waiting.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn set_quitting(&mut self, desired: bool) {
        if desired && !self.is_quitting {
            self.is_quitting = true;
            self.num_quitting.fetch_add(1, Ordering::SeqCst);
        } else if !desired && self.is_quitting {
            self.is_quitting = false;
            self.num_quitting.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub struct WorkerPool {
    num_workers: usize,
}

impl WorkerPool {
    pub fn new(num_workers: usize) -> WorkerPool {
        WorkerPool {
            num_workers: num_workers.max(1),
        }
    }

    /// Walk `root` and read every `.graphql` file under it.
    pub fn work(&self, root: &Path) -> (Vec<(PathBuf, String)>, Vec<PrintableMessage>) {
        let threads = self.num_workers;
        let (tx, rx) = channel::unbounded();
        let (output_tx, output_rx) = channel::unbounded();
        let num_waiting = Arc::new(AtomicUsize::new(threads));
        let num_quitting = Arc::new(AtomicUsize::new(0));
        // Seed before spawning so no worker ever observes an empty queue
        // with every peer idle and quits early
        tx.send(Message::Work(Work::DirEntry(root.to_path_buf())))
            .unwrap();
        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            let worker = Worker {
                threads,
                is_waiting: true,
                is_quitting: false,
                num_waiting: num_waiting.clone(),
                num_quitting: num_quitting.clone(),
                tx: tx.clone(),
                rx: rx.clone(),
                output: output_tx.clone(),
            };
            handles.push(thread::spawn(|| worker.run()));
        }
        drop(tx);
        drop(rx);
        drop(output_tx);
        for handle in handles {
            handle.join().unwrap();
        }
        let mut sources = Vec::new();
        let mut failures = Vec::new();
        for output in output_rx.iter() {
            match output {
                WorkOutput::Source { path, contents } => sources.push((path, contents)),
                WorkOutput::Failure(message) => failures.push(message),
            }
        }
        sources.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        (sources, failures)
    }
}
