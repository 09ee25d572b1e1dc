mod clicks;
mod phrases;
