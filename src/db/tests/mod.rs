mod exports;
mod tasks;
