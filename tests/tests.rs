mod general;
