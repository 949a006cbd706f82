//! Unix serial port implementation
//!
//! Opens a tty device and configures it with termios: raw mode, 7 data
//! bits, even parity, 1 stop bit, XON/XOFF in both directions, no hardware
//! flow control. Reads are bounded by `poll` so the caller can loop.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::libc;
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::termios::{
    self, BaudRate, ControlFlags, InputFlags, SetArg, SpecialCharacterIndices,
};

use super::{Interrupt, Link, LinkError, LinkResult, LinkSettings};

/// Map a numeric line speed onto a termios rate
pub fn baud_rate(baud: u32) -> LinkResult<BaudRate> {
    let rate = match baud {
        300 => BaudRate::B300,
        600 => BaudRate::B600,
        1200 => BaudRate::B1200,
        1800 => BaudRate::B1800,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        other => return Err(LinkError::UnsupportedBaud(other)),
    };
    Ok(rate)
}

/// An exclusively owned serial connection to the terminal
pub struct SerialLink {
    settings: LinkSettings,
    /// `None` while released to a collaborator
    file: Option<File>,
    interrupt: Interrupt,
}

impl SerialLink {
    /// Open and configure the device described by `settings`
    pub fn open(settings: LinkSettings) -> LinkResult<Self> {
        let file = open_device(&settings)?;
        tracing::info!(
            device = %settings.device.display(),
            baud = settings.baud,
            "Serial link open (7E1, XON/XOFF)"
        );
        Ok(Self {
            settings,
            file: Some(file),
            interrupt: Interrupt::new(),
        })
    }

    /// Fail reads and writes once `interrupt` is raised
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    fn file(&self) -> LinkResult<&File> {
        self.file.as_ref().ok_or(LinkError::Closed)
    }

    fn writable(&self) -> io::Result<&File> {
        self.interrupt.check().map_err(LinkError::into_io)?;
        self.file().map_err(LinkError::into_io)
    }
}

impl Link for SerialLink {
    fn read_byte(&mut self) -> LinkResult<Option<u8>> {
        self.interrupt.check()?;
        let mut file = self.file()?;

        let timeout = i32::try_from(self.settings.poll_interval.as_millis()).unwrap_or(i32::MAX);
        let fd = file.as_fd();
        let mut fds = [PollFd::new(&fd, PollFlags::POLLIN)];
        let ready = match poll(&mut fds, timeout) {
            Ok(n) => n > 0,
            // A signal landed mid-poll; the flag check below decides
            Err(Errno::EINTR) => false,
            Err(e) => return Err(LinkError::Poll(e)),
        };
        self.interrupt.check()?;
        if !ready {
            return Ok(None);
        }

        let mut buf = [0u8; 1];
        match file.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => {
                tracing::debug!("rx=0x{:02X}", buf[0]);
                Ok(Some(buf[0]))
            },
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                Ok(None)
            },
            Err(e) => Err(LinkError::Io(e)),
        }
    }

    fn release(&mut self) {
        if self.file.take().is_some() {
            tracing::info!(device = %self.settings.device.display(), "Serial link released");
        }
    }

    fn reacquire(&mut self) -> LinkResult<()> {
        if self.file.is_none() {
            self.file = Some(open_device(&self.settings)?);
            tracing::info!(device = %self.settings.device.display(), "Serial link reopened");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.writable()?;
        file.write(buf)
    }

    /// Block until the kernel has pushed every queued byte onto the wire
    fn flush(&mut self) -> io::Result<()> {
        let file = self.writable()?;
        termios::tcdrain(file).map_err(io::Error::from)
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.release();
    }
}

/// Open the device without making it our controlling terminal
fn open_device(settings: &LinkSettings) -> LinkResult<File> {
    let rate = baud_rate(settings.baud)?;

    // O_NONBLOCK so the open does not wait for carrier; cleared below
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(&settings.device)
        .map_err(|source| LinkError::Open {
            path: settings.device.clone(),
            source,
        })?;

    configure(&file, rate)?;

    let flags = fcntl(file.as_raw_fd(), FcntlArg::F_GETFL).map_err(LinkError::Termios)?;
    let flags = OFlag::from_bits_truncate(flags) & !OFlag::O_NONBLOCK;
    fcntl(file.as_raw_fd(), FcntlArg::F_SETFL(flags)).map_err(LinkError::Termios)?;

    Ok(file)
}

/// Raw 7E1 framing with software flow control
fn configure(file: &File, rate: BaudRate) -> LinkResult<()> {
    let mut tio = termios::tcgetattr(file).map_err(LinkError::Termios)?;

    termios::cfmakeraw(&mut tio);
    termios::cfsetspeed(&mut tio, rate).map_err(LinkError::Termios)?;

    tio.control_flags &= !(ControlFlags::CSIZE | ControlFlags::PARODD | ControlFlags::CSTOPB);
    tio.control_flags |= ControlFlags::CS7 | ControlFlags::PARENB;
    tio.control_flags |= ControlFlags::CREAD | ControlFlags::CLOCAL;
    #[cfg(any(target_os = "linux", target_os = "android"))]
    tio.control_flags.remove(ControlFlags::CRTSCTS);

    tio.input_flags |= InputFlags::IXON | InputFlags::IXOFF | InputFlags::INPCK | InputFlags::ISTRIP;
    tio.input_flags.remove(InputFlags::IXANY);

    // Readiness comes from poll; a read never waits
    tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    tio.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

    termios::tcsetattr(file, SetArg::TCSANOW, &tio).map_err(LinkError::Termios)
}
