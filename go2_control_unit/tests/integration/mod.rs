mod closed_loop;
mod config_file;
mod threaded;
