/*!
Survey documents of the school data collection.

A survey document describes one school: identity, students per section, teachers,
continuation after graduation, infrastructure, planned works and institutional status.
The sections depend on the category of the school, see [`CategoryConfig`].

```
use school_survey::*;
use school_survey::path::set;

let config = lookup("SD");
let doc = form::build(config);
let doc = set(&doc, "siswa.kelas1.l", Node::from(10u64));
let doc = set(&doc, "npsn", Node::from("20212345"));

let payload = payload::build_create_payload(&payload::PayloadInput::new(&doc, config, "SD"))
    .unwrap();
assert_eq!(payload.school.st_male, 10);
assert_eq!(payload.staff_summary.len(), 7);
```

See the [`manual`] for the layout of documents, payloads and spreadsheets.
*/

mod config;
mod document;

pub mod aggregate;
pub mod batch;
pub mod form;
pub mod normalize;
pub mod path;
pub mod payload;
pub mod record;
pub mod sheet;

pub mod manual;

pub use crate::config::*;
pub use crate::document::*;
