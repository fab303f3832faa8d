mod flowchart;
mod generation;
mod preprocess;
