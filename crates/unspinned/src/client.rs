//! A session with TheSkyX's scripting socket.

use std::{
    io::{self, BufReader, Read, Write},
    net::{TcpStream, ToSocketAddrs},
};

use tracing::{debug, instrument};

use crate::{
    angle::Degrees,
    error::{Error, Result},
    response::read_response,
    state::State,
};

/// Port TheSkyX listens on unless reconfigured.
pub const DEFAULT_PORT: u16 = 3040;

/// Collects longitude, latitude, rotator angle and alt/az into one JSON reply.
macro_rules! state_script_body {
    () => {
        r"var ret = {}
sky6StarChart.DocumentProperty(1);
ret.Longitude = sky6StarChart.DocPropOut;

sky6StarChart.DocumentProperty(0);
ret.Latitude = sky6StarChart.DocPropOut;

ret.RotatorAngle = ccdsoftCamera.rotatorPositionAngle();

sky6RASCOMTele.GetAzAlt();
ret.PointingAt = {
	Alt: sky6RASCOMTele.dAlt,
	Az: sky6RASCOMTele.dAz
}

JSON.stringify(ret)
"
    };
}

macro_rules! script_header {
    () => {
        "\n/* Java Script */\n/* Socket Start Packet */\n"
    };
}

macro_rules! script_footer {
    () => {
        "/* Socket End Packet */\n"
    };
}

/// Reads the current [`State`].
pub const GET_STATE_SCRIPT: &str = concat!(script_header!(), state_script_body!(), script_footer!());

/// Starts a rotator move to `angle`, then reads the [`State`].
#[must_use]
pub fn rotate_script(angle: Degrees) -> String {
    format!(
        concat!(
            script_header!(),
            "ccdsoftCamera.rotatorGotoPositionAngle({});\n{}",
            script_footer!()
        ),
        angle,
        state_script_body!()
    )
}

/// One connection to TheSkyX.
///
/// Exchanges are strictly sequential: each call writes a script and reads its
/// whole reply before returning. Reads go through a buffer owned by the
/// client, so anything that arrives early is kept for the next exchange. The
/// connection is closed when the client is dropped.
#[derive(Debug)]
pub struct Client<S> {
    stream: BufReader<S>,
}

impl Client<TcpStream> {
    /// Connects over TCP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the connection cannot be established.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        if let Ok(peer) = stream.peer_addr() {
            debug!(%peer, "connected to TheSkyX");
        }
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> Client<S> {
    /// Wraps an already connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Reads site, rotator and pointing state.
    ///
    /// # Errors
    ///
    /// Transport, decode and remote errors; see [`Error`].
    #[instrument(level = "trace", skip(self))]
    pub fn state(&mut self) -> Result<State> {
        self.exchange(GET_STATE_SCRIPT)
    }

    /// Moves the rotator to `angle` and returns the state afterwards.
    ///
    /// TheSkyX refuses a move while another is running; that comes back as an
    /// [`Error::Protocol`].
    ///
    /// # Errors
    ///
    /// Transport, decode and remote errors; see [`Error`].
    #[instrument(level = "trace", skip(self))]
    pub fn rotate(&mut self, angle: Degrees) -> Result<State> {
        self.exchange(&rotate_script(angle))
    }

    /// Sends an arbitrary script and decodes its JSON reply as `T`.
    ///
    /// # Errors
    ///
    /// Transport, decode and remote errors; see [`Error`].
    pub fn exchange<T: serde::de::DeserializeOwned>(&mut self, script: &str) -> Result<T> {
        self.send(script.as_bytes())?;
        read_response(&mut self.stream)
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Releases the stream. Input already buffered is discarded.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.get_mut();
        let mut written = 0;
        while written < data.len() {
            match stream.write(&data[written..]) {
                Ok(0) => {
                    return Err(Error::IncompleteWrite {
                        written,
                        expected: data.len(),
                    });
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        stream.flush()?;
        Ok(())
    }
}
