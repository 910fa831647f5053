use std::error::Error;
use std::path::Path;

use scene_viewer::{App, ViewerConfig};
use winit::event_loop::EventLoop;

fn main() -> Result<(), Box<dyn Error>> {
  env_logger::init();

  let config = ViewerConfig::load_or_default(Path::new("viewer.toml"))?;
  let event_loop = EventLoop::new()?;
  let mut app = App::new(&event_loop, config)?;
  Ok(event_loop.run_app(&mut app)?)
}
