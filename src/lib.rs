// SPDX-License-Identifier: MIT

/*!
# httpsdemo

A set of illustrative command-line demos showing TLS-secured HTTP, plus an
unrelated checksum utility that ships in the same demo set.

## Components

* `https-client` performs a single HTTPS GET and prints certificate metadata,
  response headers, and the body, each section behind its own flag.
* `https-server` serves a canned plaintext response over TLS from a bundled
  self-signed keystore, for manual or automated testing against the client.
* `checksum` prints a cryptographic digest (MD5 by default) of one file.

The client and server flows are independent; they only meet when the client
is pointed at the locally running server with `--use-local-keystore`, at
which point both sides share the bundled self-signed certificate.

<div class="warning">The bundled keystore, its fixed passphrase, and the
client's hostname-verification bypass are demo fixtures. None of this is
suitable for anything beyond local experimentation.</div>
*/

pub mod checksum;
pub mod cli;
pub mod client;
pub mod error;
pub(crate) mod http;
pub mod keystore;
pub mod server;
