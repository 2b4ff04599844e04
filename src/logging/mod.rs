use chrono::{format::DelayedFormat, Local};
use crossbeam_channel::{bounded, unbounded, Sender};
use once_cell::sync::Lazy;
use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("default"));

const LINE_CAPACITY: usize = 2048;
/// 等待寫檔線程回應 flush 的上限
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

enum Message {
    Line(String),
    /// 寫出緩衝內容後回覆
    Flush(Sender<()>),
}

/// 依等級分檔的非同步檔案日誌
///
/// 每個等級各自擁有一條 channel 與寫檔線程，呼叫端只負責送出訊息。
pub struct Logger {
    info_writer: Sender<Message>,
    warn_writer: Sender<Message>,
    error_writer: Sender<Message>,
    debug_writer: Sender<Message>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        Logger {
            info_writer: Self::create_writer(&format!("{}_info", log_name)),
            warn_writer: Self::create_writer(&format!("{}_warn", log_name)),
            error_writer: Self::create_writer(&format!("{}_error", log_name)),
            debug_writer: Self::create_writer(&format!("{}_debug", log_name)),
        }
    }

    pub fn info(&self, log: String) {
        self.send(log, &self.info_writer);
    }

    pub fn warn(&self, log: String) {
        self.send(log, &self.warn_writer);
    }

    pub fn error(&self, log: String) {
        self.send(log, &self.error_writer);
    }

    pub fn debug(&self, log: String) {
        self.send(log, &self.debug_writer);
    }

    /// 等待各等級的寫檔線程把已送出的訊息寫入檔案。
    ///
    /// 寫檔線程是分離的，程式結束前須呼叫，否則最後幾行可能遺失。
    pub fn flush(&self) {
        for writer in [
            &self.info_writer,
            &self.warn_writer,
            &self.error_writer,
            &self.debug_writer,
        ] {
            let (ack_tx, ack_rx) = bounded::<()>(1);
            if writer.send(Message::Flush(ack_tx)).is_err() {
                continue;
            }

            if ack_rx.recv_timeout(FLUSH_TIMEOUT).is_err() {
                error_console("Timed out waiting for the log writer to flush".to_string());
            }
        }
    }

    fn send(&self, msg: String, writer: &Sender<Message>) {
        if let Err(why) = writer.send(Message::Line(msg)) {
            error_console(why.to_string());
        }
    }

    fn create_writer(log_name: &str) -> Sender<Message> {
        let (tx, rx) = unbounded::<Message>();
        let log_path = match Self::get_log_path(log_name) {
            Some(p) => p,
            None => {
                error_console(format!("Failed to create log directory for {}", log_name));
                return tx;
            }
        };

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let file = match OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
            {
                Ok(f) => f,
                Err(why) => {
                    error_console(format!(
                        "Failed to open log file {:?} because {:?}",
                        log_path, why
                    ));
                    return;
                }
            };

            let mut writer = BufWriter::new(file);
            let mut line = String::with_capacity(LINE_CAPACITY);

            for received in &rx {
                let ack = match received {
                    Message::Line(msg) => {
                        if writeln!(&mut line, "{} {}", Local::now().format("%F %X%.6f"), msg)
                            .is_err()
                        {
                            continue;
                        }
                        None
                    }
                    Message::Flush(ack) => Some(ack),
                };

                if ack.is_some() || rx.is_empty() || line.len() >= LINE_CAPACITY {
                    if let Err(why) = writer.write_all(line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    if let Err(why) = writer.flush() {
                        error_console(format!("Failed to flush log file. because:{:#?}", why));
                    }

                    line.clear();
                }

                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        });

        tx
    }

    fn get_log_path(name: &str) -> Option<PathBuf> {
        let path = Path::new("log");

        if !path.exists() {
            fs::create_dir_all(path).ok()?;
        }

        let mut log_path = PathBuf::from(path);
        log_path.push(format!("{}_{}.log", Local::now().format("%Y-%m-%d"), name));

        Some(log_path)
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

/// 等待預設日誌寫入檔案，程式結束前呼叫
pub fn flush() {
    LOGGER.flush();
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    println!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}
